//! Tutor companion server.
//!
//! - Axum HTTP + WebSocket chapter sessions
//! - Optional OpenAI code feedback
//! - Static files from ./static
//!
//! Important env variables:
//!   PORT                       : u16 (default 3000)
//!   TUTOR_CONFIG_PATH          : TOML with [prompts] and [backend]
//!   TUTOR_BACKEND_URL          : tutorials backend base URL
//!   TUTOR_REQUEST_TIMEOUT_SECS : outbound timeout (default 20)
//!   OPENAI_API_KEY             : enables code feedback if present
//!   OPENAI_BASE_URL            : default "https://api.openai.com/v1"
//!   OPENAI_MODEL               : default "gpt-4o-mini"
//!   LOG_LEVEL                  : tracing filter
//!   LOG_FORMAT                 : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing::info;

use tutor_companion::routes::build_router;
use tutor_companion::state::AppState;
use tutor_companion::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let state = Arc::new(AppState::from_env()?);
  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "tutor", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "tutor", "server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "tutor", error = %e, "failed to listen for ctrl-c");
  }
}
