//! Conversational running coach
//!
//! The coach owns the prompts and the training context; the message log lives
//! in a [`Conversation`] the caller holds, so one coach can serve any number
//! of independent conversations.

use thiserror::Error;
use tracing::{debug, warn};

use crate::analysis::TrainingAnalyzer;
use crate::llm::{ChatMessage, LlmError, TextGenerator};

pub const DEFAULT_MAX_TOKENS: u32 = 2000;

const COACH_SYSTEM_PROMPT: &str = include_str!("prompts/coach_system.txt");

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum CoachError {
  #[error("No training data loaded")]
  NoTrainingData,

  #[error("No active conversation")]
  EmptyConversation,

  #[error("Coach request failed: {0}")]
  Llm(#[from] LlmError),
}

/// ---------------------------------------------------------------------------
/// Conversation State
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Conversation {
  messages: Vec<ChatMessage>,
}

impl Conversation {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.messages.is_empty()
  }

  pub fn len(&self) -> usize {
    self.messages.len()
  }

  pub fn messages(&self) -> &[ChatMessage] {
    &self.messages
  }

  /// Forget every turn. The coach keeps its training context.
  pub fn reset(&mut self) {
    self.messages.clear();
  }
}

/// ---------------------------------------------------------------------------
/// Canned Prompts
/// ---------------------------------------------------------------------------

const ANALYSIS_PROMPT: &str = r#"Analyze the training data provided and write a complete report covering:

1. **Current state**: where does the athlete stand on volume, consistency and progression?
2. **Strengths**: what are they doing well?
3. **Areas to improve**: what needs attention?
4. **Specific recommendations**: 3-5 concrete actions for the coming weeks
5. **Warnings**: any sign of injury risk or overtraining

Be specific, use the actual numbers and give actionable advice."#;

const INJURY_PREVENTION_PROMPT: &str = r#"Based on my current training pattern, which injury prevention exercises do you recommend?

Include:
1. Specific strengthening exercises
2. Mobility work
3. Recommended frequency
4. Risk areas given my training"#;

const SUMMARY_PROMPT: &str =
  "Summarize the key points of our conversation and the main recommendations you have given me.";

fn race_prediction_prompt(distance: &str) -> String {
  format!(
    r#"Based on my recent training, what time could you estimate for a {distance} race?

Provide:
1. Conservative time estimate
2. Optimistic time estimate
3. Recommended target pace
4. Suggested race plan"#
  )
}

fn workout_prompt(workout_type: &str) -> String {
  format!(
    r#"Suggest a '{workout_type}' workout that suits my current level.

Include:
1. Specific warm-up
2. Main set with exact intervals and paces
3. Cool-down
4. Goal of the session
5. Heart rate zones where relevant"#
  )
}

/// ---------------------------------------------------------------------------
/// Running Coach
/// ---------------------------------------------------------------------------

pub struct RunningCoach<G: TextGenerator> {
  generator: G,
  system_prompt: String,
  training_context: Option<String>,
  max_tokens: u32,
}

impl<G: TextGenerator> RunningCoach<G> {
  pub fn new(generator: G) -> Self {
    Self {
      generator,
      system_prompt: COACH_SYSTEM_PROMPT.to_string(),
      training_context: None,
      max_tokens: DEFAULT_MAX_TOKENS,
    }
  }

  pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
    self.system_prompt = system_prompt.into();
    self
  }

  pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
    self.max_tokens = max_tokens;
    self
  }

  pub fn set_training_context(&mut self, analyzer: &TrainingAnalyzer<'_>) {
    let context = analyzer.training_context_text();
    debug!(chars = context.len(), "Training context set");
    self.training_context = Some(context);
  }

  pub fn training_context(&self) -> Option<&str> {
    self.training_context.as_deref()
  }

  /// Send one question and record the exchange in `conversation`.
  ///
  /// The training context is prepended only to the opening turn. If the
  /// generator fails, `conversation` is left exactly as it was.
  pub async fn ask(
    &self,
    conversation: &mut Conversation,
    question: &str,
    include_context: bool,
  ) -> Result<String, CoachError> {
    let user_message = match (&self.training_context, include_context && conversation.is_empty()) {
      (Some(context), true) => format!("{}\n\n---\n\nAthlete question: {}", context, question),
      _ => question.to_string(),
    };

    let mut messages = conversation.messages.clone();
    messages.push(ChatMessage::user(user_message));

    let reply = self
      .generator
      .generate(&self.system_prompt, &messages, self.max_tokens)
      .await
      .map_err(|e| {
        warn!(error = %e, "Coach request failed");
        e
      })?;

    messages.push(ChatMessage::assistant(reply.clone()));
    conversation.messages = messages;

    Ok(reply)
  }

  pub async fn analyze_training(&self, conversation: &mut Conversation) -> Result<String, CoachError> {
    if self.training_context.is_none() {
      return Err(CoachError::NoTrainingData);
    }
    self.ask(conversation, ANALYSIS_PROMPT, true).await
  }

  pub async fn predict_race_time(
    &self,
    conversation: &mut Conversation,
    distance: &str,
  ) -> Result<String, CoachError> {
    self.ask(conversation, &race_prediction_prompt(distance), true).await
  }

  pub async fn suggest_workout(
    &self,
    conversation: &mut Conversation,
    workout_type: &str,
  ) -> Result<String, CoachError> {
    self.ask(conversation, &workout_prompt(workout_type), true).await
  }

  pub async fn injury_prevention_tips(&self, conversation: &mut Conversation) -> Result<String, CoachError> {
    self.ask(conversation, INJURY_PREVENTION_PROMPT, true).await
  }

  pub async fn conversation_summary(&self, conversation: &mut Conversation) -> Result<String, CoachError> {
    if conversation.is_empty() {
      return Err(CoachError::EmptyConversation);
    }
    self.ask(conversation, SUMMARY_PROMPT, false).await
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
