//! Code feedback shared by the HTTP handlers: input validation and the
//! OpenAI call for analysis or explanation.

use tracing::{error, instrument};

use crate::protocol::CodeFeedbackIn;
use crate::state::AppState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedbackKind {
  Analyze,
  Explain,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedbackError {
  #[error("No code provided")]
  EmptyCode,
  #[error("AI feedback is not configured on this server")]
  Disabled,
  #[error("{0}")]
  Upstream(String),
}

#[instrument(level = "info", skip(state, input), fields(language = %input.language, skill_level = input.skill_level.as_str(), code_len = input.code.len()))]
pub async fn code_feedback(
  state: &AppState,
  kind: FeedbackKind,
  input: &CodeFeedbackIn,
) -> Result<String, FeedbackError> {
  if input.code.trim().is_empty() {
    return Err(FeedbackError::EmptyCode);
  }
  let oa = state.openai.as_ref().ok_or(FeedbackError::Disabled)?;
  let language = input.language.trim();
  let language = if language.is_empty() { "python" } else { language };
  let skill = input.skill_level.as_str();

  let result = match kind {
    FeedbackKind::Analyze => oa.analyze_code(&state.prompts, language, skill, &input.code).await,
    FeedbackKind::Explain => oa.explain_code(&state.prompts, language, skill, &input.code).await,
  };
  result.map_err(|e| {
    error!(target: "tutor", ?kind, error = %e, "code feedback failed");
    FeedbackError::Upstream(e)
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use std::time::Duration;

  use serde_json::json;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use crate::backend::mock::MockBackend;
  use crate::config::Prompts;
  use crate::domain::{fixtures, Difficulty};
  use crate::openai::OpenAI;

  fn input(code: &str) -> CodeFeedbackIn {
    CodeFeedbackIn { code: code.into(), language: "python".into(), skill_level: Difficulty::Beginner }
  }

  fn state(openai: Option<OpenAI>) -> AppState {
    AppState::new(Arc::new(MockBackend::new(fixtures::three_chapter_course())), openai, Prompts::default())
  }

  #[tokio::test]
  async fn blank_code_is_rejected_first() {
    let err = code_feedback(&state(None), FeedbackKind::Analyze, &input("  \n")).await.unwrap_err();
    assert_eq!(err, FeedbackError::EmptyCode);
    assert_eq!(err.to_string(), "No code provided");
  }

  #[tokio::test]
  async fn missing_openai_is_reported() {
    let err = code_feedback(&state(None), FeedbackKind::Explain, &input("print(1)")).await.unwrap_err();
    assert_eq!(err, FeedbackError::Disabled);
  }

  #[tokio::test]
  async fn upstream_text_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "content": "Prints 1." } }]
      })))
      .mount(&server)
      .await;
    let oa = OpenAI::new("k", server.uri(), "m", Duration::from_secs(5));

    let out = code_feedback(&state(oa), FeedbackKind::Explain, &input("print(1)")).await.unwrap();
    assert_eq!(out, "Prints 1.");
  }
}
