//! Chapter session over WebSocket. One connection is one chapter page: the
//! session is opened on connect, driven by client messages in order, and
//! dropped on disconnect.

use std::sync::Arc;

use axum::{
  extract::{
    ws::{Message, WebSocket},
    Query, State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument, warn, Instrument};
use uuid::Uuid;

use crate::backend::AuthToken;
use crate::collector::QuizForm;
use crate::protocol::{ChapterSessionQuery, ClientWsMessage, ServerWsMessage};
use crate::session::{ChapterSession, Completion};
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state, q), fields(course_id = q.course_id, chapter_id = q.chapter_id))]
pub async fn ws_upgrade(
  ws: WebSocketUpgrade,
  State(state): State<Arc<AppState>>,
  Query(q): Query<ChapterSessionQuery>,
) -> impl IntoResponse {
  info!(target: "tutor", "WebSocket upgrade requested");
  let span = tracing::info_span!("chapter_session", session_id = %Uuid::new_v4(), course_id = q.course_id, chapter_id = q.chapter_id);
  ws.on_upgrade(move |socket| handle_ws(socket, state, q).instrument(span))
}

async fn send(socket: &mut WebSocket, msg: &ServerWsMessage) -> bool {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e), "retryable": false }).to_string()
  });
  match socket.send(Message::Text(out)).await {
    Ok(()) => true,
    Err(e) => {
      error!(target: "tutor", error = %e, "WS send error");
      false
    }
  }
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>, q: ChapterSessionQuery) {
  let token = AuthToken::from_optional(q.token);
  let opened = ChapterSession::open(state.backend.clone(), token, q.course_id, q.chapter_id).await;
  let (mut session, page_load) = match opened {
    Ok(opened) => opened,
    Err(e) => {
      warn!(target: "tutor", error = %e, "could not open chapter session");
      send(&mut socket, &ServerWsMessage::from_error(&e)).await;
      return;
    }
  };
  info!(target: "tutor", signed_in = session.is_signed_in(), "chapter session opened");

  for reply in &opening_messages(&session, page_load) {
    if !send(&mut socket, reply).await {
      return;
    }
  }

  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let replies = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "tutor", ?incoming, "WS received");
            handle_client_ws(incoming, &mut session).await
          }
          Err(e) => vec![ServerWsMessage::Error { message: format!("Invalid JSON: {}", e), retryable: false }],
        };
        for reply in &replies {
          if !send(&mut socket, reply).await {
            return;
          }
        }
      }
      Message::Ping(payload) => {
        let _ = socket.send(Message::Pong(payload)).await;
      }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "tutor", "chapter session closed");
}

/// First replies on a fresh connection: the initial view, then the outcome of
/// the page-load completion check.
fn opening_messages(session: &ChapterSession, page_load: Completion) -> Vec<ServerWsMessage> {
  vec![
    ServerWsMessage::View { view: session.view() },
    ServerWsMessage::CompletionResult { completion: page_load },
  ]
}

/// The completion-related follow-ups: a course-completed notice when the
/// backend says so, and a fresh view when anything was recorded.
fn after_completion(completion: &Completion, session: &ChapterSession, out: &mut Vec<ServerWsMessage>) {
  if let Some(certificate_url) = completion.course_completed() {
    out.push(ServerWsMessage::CourseCompleted { certificate_url });
  }
  if matches!(completion, Completion::Recorded { .. }) {
    out.push(ServerWsMessage::View { view: session.view() });
  }
}

async fn handle_client_ws(msg: ClientWsMessage, session: &mut ChapterSession) -> Vec<ServerWsMessage> {
  let mut out = Vec::new();
  match msg {
    ClientWsMessage::Ping => out.push(ServerWsMessage::Pong),

    ClientWsMessage::SubmitQuiz { answers } => {
      match session.submit_quiz(&QuizForm::from_selections(answers)).await {
        Ok(o) => {
          out.push(ServerWsMessage::QuizResult {
            score: o.grade.score,
            passed: o.grade.passed,
            feedback: o.grade.feedback,
            completion: o.completion.clone(),
          });
          after_completion(&o.completion, session, &mut out);
        }
        Err(e) => out.push(ServerWsMessage::from_error(&e)),
      }
    }

    ClientWsMessage::SubmitPractical { code, language } => {
      session.edit_practical(code, language);
      match session.submit_practical().await {
        Ok(o) => {
          out.push(ServerWsMessage::PracticalResult {
            evaluation: o.grade.evaluation,
            passed: o.grade.passed,
            completion: o.completion.clone(),
          });
          after_completion(&o.completion, session, &mut out);
        }
        Err(e) => out.push(ServerWsMessage::from_error(&e)),
      }
    }

    ClientWsMessage::RunCode { code, language } => match session.run_code(&code, language).await {
      Ok(output) => out.push(ServerWsMessage::RunOutput { output }),
      Err(e) => out.push(ServerWsMessage::from_error(&e)),
    },

    ClientWsMessage::SelectLanguage { language } => {
      let starter_code = session.select_language(language).unwrap_or_else(|| language.starter_code());
      out.push(ServerWsMessage::LanguageSelected { language, starter_code });
    }

    ClientWsMessage::MarkComplete => {
      let completion = session.mark_complete().await;
      out.push(ServerWsMessage::CompletionResult { completion: completion.clone() });
      after_completion(&completion, session, &mut out);
    }

    ClientWsMessage::Reload => {
      let completion = session.reload().await;
      out.push(ServerWsMessage::CompletionResult { completion });
      out.push(ServerWsMessage::View { view: session.view() });
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::mock::MockBackend;
  use crate::domain::fixtures;
  use crate::error::ValidationError;
  use crate::error::WorkflowError;

  async fn session(chapter_id: i64) -> (Arc<MockBackend>, ChapterSession) {
    let backend = Arc::new(MockBackend::new(fixtures::three_chapter_course()));
    let (s, _) = ChapterSession::open(backend.clone(), Some(AuthToken::new("t")), 1, chapter_id)
      .await
      .unwrap();
    (backend, s)
  }

  #[tokio::test]
  async fn opening_sends_view_then_page_load_outcome() {
    let backend = Arc::new(MockBackend::new(fixtures::three_chapter_course()));
    let (s, page_load) = ChapterSession::open(backend.clone(), Some(AuthToken::new("t")), 1, 10)
      .await
      .unwrap();
    let replies = opening_messages(&s, page_load);

    assert_eq!(replies.len(), 2);
    assert!(matches!(&replies[0], ServerWsMessage::View { view } if view.progress.completed == 0));
    assert!(matches!(
      &replies[1],
      ServerWsMessage::CompletionResult { completion: Completion::Ineligible }
    ));
    assert!(backend.mark_complete_calls().is_empty());
  }

  #[tokio::test]
  async fn passing_quiz_replies_with_result_then_view() {
    let (_backend, mut s) = session(20).await;
    let replies = handle_client_ws(ClientWsMessage::SubmitQuiz { answers: vec![Some(0)] }, &mut s).await;

    assert_eq!(replies.len(), 2);
    assert!(matches!(replies[0], ServerWsMessage::QuizResult { passed: true, .. }));
    match &replies[1] {
      ServerWsMessage::View { view } => assert_eq!(view.progress.completed, 1),
      other => panic!("unexpected {other:?}"),
    }
  }

  #[tokio::test]
  async fn unanswered_quiz_is_a_validation_message() {
    let (backend, mut s) = session(20).await;
    let replies = handle_client_ws(ClientWsMessage::SubmitQuiz { answers: vec![None] }, &mut s).await;

    let expected = WorkflowError::Validation(ValidationError::UnansweredQuestions(vec![1])).user_message();
    assert!(matches!(&replies[..], [ServerWsMessage::Validation { message }] if *message == expected));
    assert_eq!(backend.quiz_calls(), 0);
  }

  #[tokio::test]
  async fn finishing_the_last_chapter_announces_course_completion() {
    let (backend, mut s) = session(10).await;
    backend.seed_completed(1, 20);
    backend.seed_completed(1, 30);

    let replies = handle_client_ws(ClientWsMessage::MarkComplete, &mut s).await;
    assert!(replies.iter().any(|r| matches!(
      r,
      ServerWsMessage::CourseCompleted { certificate_url: Some(url) } if url == "/tutorials/certificate/1"
    )));
  }

  #[tokio::test]
  async fn language_selection_returns_starter() {
    let (_backend, mut s) = session(30).await;
    let replies = handle_client_ws(
      ClientWsMessage::SelectLanguage { language: crate::collector::Language::Cpp },
      &mut s,
    )
    .await;
    assert!(matches!(
      &replies[..],
      [ServerWsMessage::LanguageSelected { starter_code, .. }] if starter_code.contains("#include")
    ));
  }
}
