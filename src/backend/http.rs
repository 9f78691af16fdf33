//! reqwest client for the tutorials backend.
//!
//! Every call has a timeout (set on the client). Calls are instrumented with
//! ids and sizes only; tokens and code bodies are never logged.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::{AuthToken, LearningBackend};
use crate::domain::{Course, CourseId};
use crate::error::WorkflowError;
use crate::protocol::{
    extract_error_message, parse_envelope, ContentBody, CourseBody, ExecuteBody,
    ExecuteCodeRequest, GenerateContentRequest, MarkCompleteReceipt, MarkCompleteRequest,
    PracticalGrade, PracticalSubmissionRequest, ProgressBody, ProgressMap, QuizGrade,
    QuizSubmissionRequest,
};

const UA: &str = concat!("tutor-companion/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, WorkflowError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, token: Option<&AuthToken>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, url).header(USER_AGENT, UA);
        if let Some(t) = token {
            req = req.bearer_auth(t.expose());
        }
        req
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&AuthToken>,
    ) -> Result<T, WorkflowError> {
        let req = self.request(Method::GET, path, token);
        self.send(path, req).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&AuthToken>,
        body: &B,
    ) -> Result<T, WorkflowError> {
        let req = self
            .request(Method::POST, path, token)
            .header(CONTENT_TYPE, "application/json")
            .json(body);
        self.send(path, req).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        req: RequestBuilder,
    ) -> Result<T, WorkflowError> {
        let start = std::time::Instant::now();
        let res = req.send().await.map_err(|e| {
            warn!(target: "backend", %path, error = %e, "request failed");
            WorkflowError::from(e)
        })?;

        let status = res.status();
        let bytes = res.bytes().await?;
        debug!(target: "backend", %path, status = status.as_u16(), body_len = bytes.len(), elapsed = ?start.elapsed(), "response received");

        if !status.is_success() {
            let message = extract_error_message(&bytes);
            warn!(target: "backend", %path, status = status.as_u16(), error = ?message, "non-success status");
            return Err(WorkflowError::Http { status: status.as_u16(), message });
        }
        parse_envelope(&bytes)
    }
}

#[async_trait]
impl LearningBackend for HttpBackend {
    #[instrument(level = "info", skip(self))]
    async fn fetch_course(&self, course_id: CourseId) -> Result<Course, WorkflowError> {
        let body: CourseBody = self
            .get_json(&format!("/api/tutorials/course/{course_id}"), None)
            .await?;
        body.course.normalize().map_err(WorkflowError::Malformed)
    }

    #[instrument(level = "info", skip_all, fields(course_id = request.course_id, chapter_id = request.chapter_id, answers = request.answers.as_slice().len()))]
    async fn submit_quiz(
        &self,
        token: Option<&AuthToken>,
        request: &QuizSubmissionRequest,
    ) -> Result<QuizGrade, WorkflowError> {
        self.post_json("/api/tutorials/submit-test", token, request).await
    }

    #[instrument(level = "info", skip_all, fields(course_id = request.course_id, chapter_id = request.chapter_id, code_len = request.code.len()))]
    async fn submit_practical(
        &self,
        token: Option<&AuthToken>,
        request: &PracticalSubmissionRequest,
    ) -> Result<PracticalGrade, WorkflowError> {
        self.post_json("/api/tutorials/submit-practical", token, request).await
    }

    #[instrument(level = "info", skip_all, fields(course_id = request.course_id, chapter_id = request.chapter_id))]
    async fn mark_complete(
        &self,
        token: &AuthToken,
        request: &MarkCompleteRequest,
    ) -> Result<MarkCompleteReceipt, WorkflowError> {
        self.post_json("/api/tutorials/mark-complete", Some(token), request).await
    }

    #[instrument(level = "info", skip_all)]
    async fn load_progress(&self, token: &AuthToken) -> Result<ProgressMap, WorkflowError> {
        let body: ProgressBody = self.get_json("/api/tutorials/progress", Some(token)).await?;
        Ok(body.into_map())
    }

    #[instrument(level = "info", skip_all, fields(language = request.language.as_str(), code_len = request.code.len()))]
    async fn execute_code(&self, request: &ExecuteCodeRequest) -> Result<String, WorkflowError> {
        let body: ExecuteBody = self.post_json("/api/execute-code", None, request).await?;
        Ok(body.output)
    }

    #[instrument(level = "info", skip_all, fields(kind = ?request.kind, current_len = request.current_text.len()))]
    async fn generate_content(&self, request: &GenerateContentRequest) -> Result<String, WorkflowError> {
        let body: ContentBody = self.post_json("/api/admin/generate-content", None, request).await?;
        Ok(body.content)
    }
}
