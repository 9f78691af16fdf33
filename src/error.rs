//! Error taxonomy for the progression workflow.
//!
//! Every failure a learner can run into falls in one of a few buckets:
//! local validation (never leaves the process), transport, remote-reported,
//! malformed response, or missing authentication. None of them is fatal.

use serde::Serialize;

/// Input problems caught before any request is built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// 1-based numbers of the questions without a selected option.
    #[error("Please answer all questions before submitting (missing: {})", join_numbers(.0))]
    UnansweredQuestions(Vec<usize>),

    #[error("Question {question} has no option {selected}")]
    OptionOutOfRange { question: usize, selected: usize },

    #[error("This chapter has no quiz questions")]
    NoQuestions,

    #[error("Please write some code before submitting.")]
    EmptyCode,
}

fn join_numbers(ns: &[usize]) -> String {
    ns.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Transport,
    Remote,
    Malformed,
    Unauthenticated,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The request never produced a response (connect error, timeout, ...).
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx status. `message` carries the body's `error` field when present.
    #[error("Server returned HTTP {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Http { status: u16, message: Option<String> },

    /// `{ success: false, error }` from the backend, surfaced verbatim.
    #[error("{0}")]
    Remote(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Not signed in; progress is not saved")]
    Unauthenticated,
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::Validation(_) => ErrorKind::Validation,
            WorkflowError::Network(_) | WorkflowError::Http { .. } => ErrorKind::Transport,
            WorkflowError::Remote(_) => ErrorKind::Remote,
            WorkflowError::Malformed(_) => ErrorKind::Malformed,
            WorkflowError::Unauthenticated => ErrorKind::Unauthenticated,
        }
    }

    /// Everything except missing auth can be retried by the learner as-is
    /// (validation after fixing the input).
    pub fn is_retryable(&self) -> bool {
        !matches!(self, WorkflowError::Unauthenticated)
    }

    /// Text shown to the learner. Transport problems get a generic message
    /// (an HTTP body's `error` is only logged); remote errors are passed
    /// through.
    pub fn user_message(&self) -> String {
        match self {
            WorkflowError::Validation(v) => v.to_string(),
            WorkflowError::Network(_) | WorkflowError::Http { .. } => {
                "Could not reach the server. Please try again.".into()
            }
            WorkflowError::Remote(m) => m.clone(),
            WorkflowError::Malformed(_) => {
                "The server sent an unexpected response. Please try again.".into()
            }
            WorkflowError::Unauthenticated => {
                "Sign in to save your progress.".into()
            }
        }
    }
}

impl From<reqwest::Error> for WorkflowError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            WorkflowError::Malformed(e.to_string())
        } else {
            WorkflowError::Network(e.to_string())
        }
    }
}
