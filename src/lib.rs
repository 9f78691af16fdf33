//! Tutor companion: chapter progression and assessment gating for the
//! tutorials platform, plus AI code feedback.
//!
//! Bottom-up: `collector` builds submissions, `gate` decides completion,
//! `progress` mirrors the backend's completion flags, `reconcile` derives the
//! page view, and `session` ties them together for one open chapter.

pub mod authoring;
pub mod backend;
pub mod collector;
pub mod config;
pub mod domain;
pub mod error;
pub mod gate;
pub mod logic;
pub mod openai;
pub mod progress;
pub mod protocol;
pub mod reconcile;
pub mod routes;
pub mod selection;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod util;

pub use error::{ValidationError, WorkflowError};
pub use session::{ChapterSession, Completion};
