use axum::{routing::get, Router};

use crate::state::AppState;

pub fn ping_routes() -> Router<AppState> {
    Router::new().route("/ping", get(ping))
}

/// Liveness probe.
pub async fn ping() -> &'static str {
    "pong"
}
