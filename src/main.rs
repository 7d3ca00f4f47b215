use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::EnvFilter;

/// `run-coach` prints the training context; `run-coach <question...>` asks the coach.
#[tokio::main]
async fn main() -> ExitCode {
  let env_filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new("info"))
    .add_directive(
      "reqwest=warn"
        .parse()
        .unwrap_or_else(|_| tracing::Level::WARN.into()),
    );
  tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_writer(std::io::stderr)
    .init();

  let args: Vec<String> = std::env::args().skip(1).collect();
  let question = (!args.is_empty()).then(|| args.join(" "));

  match run_coach_lib::run(question).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      error!(error = %e, "run-coach failed");
      ExitCode::FAILURE
    }
  }
}
