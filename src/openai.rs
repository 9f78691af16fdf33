//! Minimal OpenAI chat-completions client for code feedback.
//!
//! Calls are instrumented with model name, latency and sizes. The API key and
//! the submitted code are never logged.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::util::{fill_template, trunc_for_log};

const UA: &str = concat!("tutor-companion/", env!("CARGO_PKG_VERSION"));

/// Sampling settings per feedback kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sampling {
  pub temperature: f32,
  pub max_tokens: u32,
}

pub const ANALYZE: Sampling = Sampling { temperature: 0.7, max_tokens: 700 };
pub const EXPLAIN: Sampling = Sampling { temperature: 0.5, max_tokens: 600 };

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenAI {
  /// Some(client) when OPENAI_API_KEY is set.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    Self::new(api_key, base_url, model, Duration::from_secs(20))
  }

  pub fn new(
    api_key: impl Into<String>,
    base_url: impl Into<String>,
    model: impl Into<String>,
    timeout: Duration,
  ) -> Option<Self> {
    let client = reqwest::Client::builder().timeout(timeout).build().ok()?;
    Some(Self {
      client,
      api_key: api_key.into(),
      base_url: base_url.into().trim_end_matches('/').to_string(),
      model: model.into(),
    })
  }

  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model, user_len = user.len()))]
  async fn chat_plain(&self, system: &str, user: &str, sampling: Sampling) -> Result<String, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature: sampling.temperature,
      max_tokens: Some(sampling.max_tokens),
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, UA)
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      error!(target: "openai", %status, elapsed = ?start.elapsed(), "OpenAI call failed");
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(target: "openai", prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, elapsed = ?start.elapsed(), "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();

    if text.is_empty() {
      return Err("OpenAI returned an empty completion".into());
    }
    Ok(text)
  }

  #[instrument(level = "info", skip(self, prompts, code), fields(%language, %skill_level, code_len = code.len()))]
  pub async fn analyze_code(
    &self,
    prompts: &Prompts,
    language: &str,
    skill_level: &str,
    code: &str,
  ) -> Result<String, String> {
    let vars = [("language", language), ("skill_level", skill_level), ("code", code)];
    let system = fill_template(&prompts.analyze_system, &vars);
    let user = fill_template(&prompts.analyze_user_template, &vars);
    self.chat_plain(&system, &user, ANALYZE).await
  }

  #[instrument(level = "info", skip(self, prompts, code), fields(%language, %skill_level, code_len = code.len()))]
  pub async fn explain_code(
    &self,
    prompts: &Prompts,
    language: &str,
    skill_level: &str,
    code: &str,
  ) -> Result<String, String> {
    let vars = [("language", language), ("skill_level", skill_level), ("code", code)];
    let system = fill_template(&prompts.explain_system, &vars);
    let user = fill_template(&prompts.explain_user_template, &vars);
    self.chat_plain(&system, &user, EXPLAIN).await
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// `error.message` from an OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
