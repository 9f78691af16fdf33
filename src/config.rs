//! Companion configuration: prompt templates for code feedback and the
//! tutorials backend location, from TOML plus environment overrides.
//!
//! TOML schema (all sections optional):
//!
//! ```toml
//! [prompts]
//! analyze_system = "..."
//! analyze_user_template = "... {language} ... {skill_level} ... {code}"
//!
//! [backend]
//! base_url = "http://localhost:5000"
//! timeout_secs = 20
//! ```

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info, warn};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct TutorConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub backend: BackendCfg,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BackendCfg {
  pub base_url: String,
  pub timeout_secs: u64,
}

impl Default for BackendCfg {
  fn default() -> Self {
    Self { base_url: "http://localhost:5000".into(), timeout_secs: 20 }
  }
}

impl BackendCfg {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs.max(1))
  }
}

/// Templates take `{language}`, `{skill_level}` and `{code}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub analyze_system: String,
  pub analyze_user_template: String,
  pub explain_system: String,
  pub explain_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      analyze_system: "You are an expert {language} programmer and code reviewer.".into(),
      analyze_user_template: "Analyze this {language} code for a {skill_level} programmer:\n\n```{language}\n{code}\n```\n\n\
Provide a comprehensive analysis including:\n\n\
**Code Quality & Structure:** overall quality, organization and readability.\n\
**Best Practices:** adherence to {language} best practices, naming, structure improvements.\n\
**Potential Issues:** logic errors or bugs, performance, security concerns (if any).\n\
**Suggestions:** specific improvements, alternative approaches or patterns.\n\
**Learning Points:** key concepts demonstrated, areas to study further.\n\n\
Tailor your explanations to a {skill_level} level programmer.".into(),
      explain_system: "You are an expert {language} programming instructor.".into(),
      explain_user_template: "Explain this {language} code step by step for a {skill_level} level programmer:\n\n```{language}\n{code}\n```\n\n\
Include:\n\n\
**Code Walkthrough:** section-by-section breakdown, what each part does and why.\n\
**Concepts Explained:** programming concepts used and {language}-specific syntax.\n\
**How It Works:** flow of execution and expected output.\n\
**Key Takeaways:** principles demonstrated and vocabulary to remember.\n\n\
Use simple, clear language appropriate for a {skill_level} level programmer.".into(),
    }
  }
}

/// Read and parse the file named by TUTOR_CONFIG_PATH. Any IO or parse error
/// is logged and yields None.
pub fn load_tutor_config_from_env() -> Option<TutorConfig> {
  let path = std::env::var("TUTOR_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<TutorConfig>(&s) {
      Ok(cfg) => {
        info!(target: "tutor", %path, "Loaded tutor config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "tutor", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "tutor", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

/// File config (or defaults) with TUTOR_BACKEND_URL and
/// TUTOR_REQUEST_TIMEOUT_SECS applied on top.
pub fn resolve() -> TutorConfig {
  let mut cfg = load_tutor_config_from_env().unwrap_or_default();
  apply_env(&mut cfg, |k| std::env::var(k).ok());
  cfg
}

fn apply_env(cfg: &mut TutorConfig, get: impl Fn(&str) -> Option<String>) {
  if let Some(url) = get("TUTOR_BACKEND_URL").filter(|u| !u.trim().is_empty()) {
    cfg.backend.base_url = url;
  }
  if let Some(raw) = get("TUTOR_REQUEST_TIMEOUT_SECS") {
    match raw.parse::<u64>() {
      Ok(secs) => cfg.backend.timeout_secs = secs,
      Err(e) => warn!(target: "tutor", value = %raw, error = %e, "Ignoring invalid TUTOR_REQUEST_TIMEOUT_SECS"),
    }
  }
}
