//! Built-in routes.

use axum::{Router, extract::State, routing::get};

use super::AppState;

pub(super) fn routes() -> Router<AppState> { Router::new().route("/healthcheck", get(healthcheck)) }

/// `GET /healthcheck`: the configured working text, read per request.
async fn healthcheck(State(state): State<AppState>) -> String { state.config.working_text() }
