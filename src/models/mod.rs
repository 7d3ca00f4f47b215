pub mod activity;

pub use activity::{activities_from_values, parse_activities, Activity, ActivityError, RUNNING_TYPES};
