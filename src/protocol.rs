//! Wire types, in three groups:
//!   - requests sent to the tutorials backend, and the typed, validated
//!     results parsed from its `{ success, ... }` envelopes;
//!   - the companion's own HTTP DTOs (code feedback, health);
//!   - WebSocket chapter-session messages.
//!
//! Backend bodies are never trusted: anything that does not match the
//! expected shape becomes `WorkflowError::Malformed`.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collector::{Language, QuizAnswers};
use crate::domain::{ChapterId, Course, CourseId, Difficulty};
use crate::error::WorkflowError;
use crate::reconcile::CourseView;
use crate::session::Completion;

//
// Outbound requests
//

#[derive(Debug, Clone, Serialize)]
pub struct QuizSubmissionRequest {
    pub course_id: CourseId,
    pub chapter_id: ChapterId,
    pub answers: QuizAnswers,
}

#[derive(Debug, Clone, Serialize)]
pub struct PracticalSubmissionRequest {
    pub course_id: CourseId,
    pub chapter_id: ChapterId,
    pub code: String,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkCompleteRequest {
    pub course_id: CourseId,
    pub chapter_id: ChapterId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practical_passed: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecuteCodeRequest {
    pub code: String,
    pub language: Language,
}

/// Kinds of text the admin editor asks the content generator for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    CourseSubtitle,
    CourseDescription,
    ChapterObjectives,
    ChapterContent,
    PracticalInstructions,
    PracticalEvaluationCriteria,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateContentRequest {
    #[serde(rename = "type")]
    pub kind: ContentType,
    pub context: serde_json::Map<String, Value>,
    pub current_text: String,
}

//
// Validated backend results
//

#[derive(Deserialize)]
struct RawQuizGrade {
    score: f64,
    passed: bool,
    #[serde(default)]
    feedback: String,
}

/// Quiz grading result; `score` is a percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQuizGrade")]
pub struct QuizGrade {
    pub score: u8,
    pub passed: bool,
    pub feedback: String,
}

impl TryFrom<RawQuizGrade> for QuizGrade {
    type Error = String;

    fn try_from(raw: RawQuizGrade) -> Result<Self, Self::Error> {
        if !raw.score.is_finite() || !(0.0..=100.0).contains(&raw.score) {
            return Err(format!("score {} outside 0-100", raw.score));
        }
        Ok(Self { score: raw.score.round() as u8, passed: raw.passed, feedback: raw.feedback })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticalGrade {
    pub evaluation: String,
    pub passed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkCompleteReceipt {
    #[serde(default)]
    pub course_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_url: Option<String>,
}

/// Stored progress for one chapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterProgress {
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practical_passed: Option<bool>,
}

/// Older progress payloads store a bare `true` per chapter.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProgressEntry {
    Flag(bool),
    Detail(ChapterProgress),
}

impl From<ProgressEntry> for ChapterProgress {
    fn from(e: ProgressEntry) -> Self {
        match e {
            ProgressEntry::Flag(completed) => ChapterProgress { completed, ..Default::default() },
            ProgressEntry::Detail(p) => p,
        }
    }
}

pub type ProgressMap = HashMap<CourseId, HashMap<ChapterId, ChapterProgress>>;

#[derive(Deserialize)]
pub(crate) struct ProgressBody {
    #[serde(default)]
    progress: HashMap<CourseId, HashMap<ChapterId, ProgressEntry>>,
}

impl ProgressBody {
    pub(crate) fn into_map(self) -> ProgressMap {
        self.progress
            .into_iter()
            .map(|(course, chapters)| {
                (course, chapters.into_iter().map(|(id, e)| (id, e.into())).collect())
            })
            .collect()
    }
}

#[derive(Deserialize)]
pub(crate) struct CourseBody {
    pub course: Course,
}

#[derive(Deserialize)]
pub(crate) struct ExecuteBody {
    #[serde(default)]
    pub output: String,
}

#[derive(Deserialize)]
pub(crate) struct ContentBody {
    pub content: String,
}

/// Parse a `{ success, error?, ...fields }` body. `success: false` is a remote
/// error carrying the backend's message verbatim.
pub fn parse_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<T, WorkflowError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| WorkflowError::Malformed(format!("invalid JSON: {e}")))?;

    let success = value
        .get("success")
        .and_then(Value::as_bool)
        .ok_or_else(|| WorkflowError::Malformed("missing `success` flag".into()))?;

    if !success {
        let msg = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("Request failed")
            .to_string();
        return Err(WorkflowError::Remote(msg));
    }

    serde_json::from_value(value).map_err(|e| WorkflowError::Malformed(e.to_string()))
}

/// `error` field of a non-2xx body, if it has one.
pub fn extract_error_message(body: &[u8]) -> Option<String> {
    #[derive(Deserialize)]
    struct EWrap {
        error: String,
    }
    serde_json::from_slice::<EWrap>(body).ok().map(|w| w.error)
}

//
// Companion HTTP DTOs
//

fn default_language() -> String {
    "python".into()
}

#[derive(Debug, Deserialize)]
pub struct CodeFeedbackIn {
    #[serde(default)]
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub skill_level: Difficulty,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeOut {
    pub success: bool,
    pub analysis: String,
}

#[derive(Debug, Serialize)]
pub struct ExplainOut {
    pub success: bool,
    pub explanation: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub success: bool,
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChapterSessionQuery {
    pub course_id: CourseId,
    pub chapter_id: ChapterId,
    #[serde(default)]
    pub token: Option<String>,
}

//
// WebSocket chapter session
//

/// Messages the page sends over its chapter session.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    SubmitQuiz {
        answers: Vec<Option<usize>>,
    },
    SubmitPractical {
        code: String,
        language: Language,
    },
    RunCode {
        code: String,
        language: Language,
    },
    SelectLanguage {
        language: Language,
    },
    /// Explicit "mark complete" for chapters without assessments.
    MarkComplete,
    /// Same as reopening the page: session markers are discarded.
    Reload,
}

/// Messages sent back to the page.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    View {
        view: CourseView,
    },
    QuizResult {
        score: u8,
        passed: bool,
        feedback: String,
        completion: Completion,
    },
    PracticalResult {
        evaluation: String,
        passed: bool,
        completion: Completion,
    },
    RunOutput {
        output: String,
    },
    LanguageSelected {
        language: Language,
        starter_code: &'static str,
    },
    CompletionResult {
        completion: Completion,
    },
    CourseCompleted {
        #[serde(skip_serializing_if = "Option::is_none")]
        certificate_url: Option<String>,
    },
    Validation {
        message: String,
    },
    Error {
        message: String,
        retryable: bool,
    },
}

impl ServerWsMessage {
    pub fn from_error(e: &WorkflowError) -> Self {
        match e {
            WorkflowError::Validation(v) => ServerWsMessage::Validation { message: v.to_string() },
            other => ServerWsMessage::Error {
                message: other.user_message(),
                retryable: other.is_retryable(),
            },
        }
    }
}
