//! HTTP routes.
//!
//! `/` and `/healthz` are fixed; every other path is a screenshot request.

mod home;
mod screenshot;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::homepage))
        .route("/healthz", get(healthz))
        .fallback(get(screenshot::screenshot))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
