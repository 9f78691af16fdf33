//! Shared application state. Immutable after startup; every chapter session
//! and request handler borrows it through an `Arc`.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::backend::{HttpBackend, LearningBackend};
use crate::config::{self, Prompts};
use crate::error::WorkflowError;
use crate::openai::OpenAI;

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn LearningBackend>,
    pub openai: Option<OpenAI>,
    pub prompts: Prompts,
}

impl AppState {
    /// Build state from env: config file + overrides, backend client, and
    /// the optional OpenAI client.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Result<Self, WorkflowError> {
        let cfg = config::resolve();
        let backend = HttpBackend::new(&cfg.backend.base_url, cfg.backend.timeout())?;
        info!(target: "tutor", base_url = %backend.base_url(), timeout_secs = cfg.backend.timeout_secs, "Tutorials backend configured");

        let openai = OpenAI::from_env();
        match &openai {
            Some(oa) => info!(target: "tutor", model = %oa.model, "OpenAI enabled"),
            None => warn!(target: "tutor", "OPENAI_API_KEY not set; code feedback is disabled"),
        }

        Ok(Self { backend: Arc::new(backend), openai, prompts: cfg.prompts })
    }

    pub fn new(backend: Arc<dyn LearningBackend>, openai: Option<OpenAI>, prompts: Prompts) -> Self {
        Self { backend, openai, prompts }
    }
}
