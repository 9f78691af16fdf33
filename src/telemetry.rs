//! Tracing setup.
//!
//! - LOG_LEVEL is an EnvFilter directive string (e.g. "debug" or
//!   "info,gate=debug,progress=debug,backend=debug").
//! - LOG_FORMAT=json switches to structured JSON; anything else is the
//!   human-readable format.
//!
//! Targets used across the crate: `tutor`, `gate`, `progress`, `backend`,
//! `authoring`, `openai`.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,tutor=debug,gate=debug,tower_http=info,axum=info";

pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}
