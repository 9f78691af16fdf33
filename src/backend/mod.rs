//! The tutorials backend as seen by the workflow: grading, progress, code
//! execution and content generation behind one object-safe trait.

use std::fmt;

use async_trait::async_trait;

use crate::domain::{Course, CourseId};
use crate::error::WorkflowError;
use crate::protocol::{
    ExecuteCodeRequest, GenerateContentRequest, MarkCompleteReceipt, MarkCompleteRequest,
    PracticalGrade, PracticalSubmissionRequest, ProgressMap, QuizGrade, QuizSubmissionRequest,
};

pub mod http;
pub mod mock;

pub use http::HttpBackend;

/// Bearer token issued by the hosted auth service. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Blank tokens mean "signed out".
    pub fn from_optional(token: Option<String>) -> Option<Self> {
        token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).map(Self)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

#[async_trait]
pub trait LearningBackend: Send + Sync {
    async fn fetch_course(&self, course_id: CourseId) -> Result<Course, WorkflowError>;

    /// Grading works for anonymous visitors too; the token only attributes
    /// the attempt.
    async fn submit_quiz(
        &self,
        token: Option<&AuthToken>,
        request: &QuizSubmissionRequest,
    ) -> Result<QuizGrade, WorkflowError>;

    async fn submit_practical(
        &self,
        token: Option<&AuthToken>,
        request: &PracticalSubmissionRequest,
    ) -> Result<PracticalGrade, WorkflowError>;

    async fn mark_complete(
        &self,
        token: &AuthToken,
        request: &MarkCompleteRequest,
    ) -> Result<MarkCompleteReceipt, WorkflowError>;

    async fn load_progress(&self, token: &AuthToken) -> Result<ProgressMap, WorkflowError>;

    async fn execute_code(&self, request: &ExecuteCodeRequest) -> Result<String, WorkflowError>;

    async fn generate_content(&self, request: &GenerateContentRequest) -> Result<String, WorkflowError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_redacted_and_blank_means_signed_out() {
        let t = AuthToken::new("secret-value");
        assert_eq!(format!("{t:?}"), "AuthToken(***)");
        assert_eq!(AuthToken::from_optional(Some("   ".into())), None);
        assert_eq!(AuthToken::from_optional(None), None);
        assert_eq!(
            AuthToken::from_optional(Some(" abc ".into())).map(|t| t.expose().to_string()),
            Some("abc".to_string())
        );
    }
}
