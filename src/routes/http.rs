//! HTTP handlers: thin wrappers over `logic::code_feedback`.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;
use tracing::{info, instrument};

use crate::logic::{code_feedback, FeedbackError, FeedbackKind};
use crate::protocol::{AnalyzeOut, CodeFeedbackIn, ErrorOut, ExplainOut, HealthOut};
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

fn error_response(e: FeedbackError) -> Response {
  match e {
    FeedbackError::EmptyCode => {
      (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response()
    }
    FeedbackError::Disabled => (
      StatusCode::SERVICE_UNAVAILABLE,
      Json(ErrorOut { success: false, error: e.to_string() }),
    )
      .into_response(),
    FeedbackError::Upstream(msg) => (
      StatusCode::INTERNAL_SERVER_ERROR,
      Json(ErrorOut { success: false, error: msg }),
    )
      .into_response(),
  }
}

#[instrument(level = "info", skip(state, body), fields(code_len = body.code.len()))]
pub async fn http_post_analyze(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CodeFeedbackIn>,
) -> Response {
  match code_feedback(&state, FeedbackKind::Analyze, &body).await {
    Ok(analysis) => {
      info!(target: "tutor", out_len = analysis.len(), "analysis served");
      Json(AnalyzeOut { success: true, analysis }).into_response()
    }
    Err(e) => error_response(e),
  }
}

#[instrument(level = "info", skip(state, body), fields(code_len = body.code.len()))]
pub async fn http_post_explain(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CodeFeedbackIn>,
) -> Response {
  match code_feedback(&state, FeedbackKind::Explain, &body).await {
    Ok(explanation) => {
      info!(target: "tutor", out_len = explanation.len(), "explanation served");
      Json(ExplainOut { success: true, explanation }).into_response()
    }
    Err(e) => error_response(e),
  }
}

#[cfg(test)]
mod tests {
  use axum::body::{to_bytes, Body};
  use axum::http::Request;
  use serde_json::Value;
  use tower::ServiceExt;

  use super::*;
  use crate::backend::mock::MockBackend;
  use crate::config::Prompts;
  use crate::domain::fixtures;
  use crate::routes::build_router;

  fn app() -> axum::Router {
    let backend = Arc::new(MockBackend::new(fixtures::three_chapter_course()));
    build_router(Arc::new(AppState::new(backend, None, Prompts::default())))
  }

  async fn post(uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
      .method("POST")
      .uri(uri)
      .header("content-type", "application/json")
      .body(Body::from(body.to_string()))
      .unwrap();
    let res = app().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), 64 * 1024).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  #[tokio::test]
  async fn health_is_ok() {
    let req = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
    let res = app().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn empty_code_is_bad_request() {
    let (status, body) = post("/api/analyze", json!({ "code": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No code provided" }));
  }

  #[tokio::test]
  async fn feedback_without_openai_is_unavailable() {
    let (status, body) = post("/api/explain", json!({ "code": "print(1)", "skill_level": "advanced" })).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
  }
}
