use axum::{http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;

mod board;
mod cards;
mod lists;

use crate::state::{AppState, StoreError};

/// Axum REST API routes.
///
///   GET    /api/board            -> full board snapshot
///   POST   /api/lists            -> create list (client-assigned id)
///   PATCH  /api/lists/:id        -> partial list update
///   DELETE /api/lists/:id        -> delete list + its cards
///   POST   /api/cards            -> create card
///   PATCH  /api/cards/:id        -> partial card update
///   DELETE /api/cards/:id        -> delete card
///   POST   /api/cards/:id/move   -> move card to a list/index, renumber
///   GET    /api/health           -> health check
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/board", get(board::get_board))
        .route("/api/lists", axum::routing::post(lists::create_list))
        .route(
            "/api/lists/{id}",
            axum::routing::patch(lists::update_list).delete(lists::delete_list),
        )
        .route("/api/cards", axum::routing::post(cards::create_card))
        .route(
            "/api/cards/{id}",
            axum::routing::patch(cards::update_card).delete(cards::delete_card),
        )
        .route("/api/cards/{id}/move", axum::routing::post(cards::move_card))
        .route("/api/health", get(board::health))
}

// ── Shared types and helpers used across sub-modules ────────────────────

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Individual validation messages, when the error is a 400 with more
    /// than a single cause.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

fn log_api_issue(status: StatusCode, target: &'static str, message: impl AsRef<str>) {
    let message = message.as_ref();
    if status.is_server_error() {
        log::error!(target: target, "{}", message);
    } else {
        log::warn!(target: target, "{}", message);
    }
}

/// Map a store error onto a status + JSON error body.
fn store_error(target: &'static str, e: StoreError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &e {
        StoreError::Validation(_) | StoreError::MissingList(_) => StatusCode::BAD_REQUEST,
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::Duplicate { .. } => StatusCode::CONFLICT,
    };
    log_api_issue(status, target, e.to_string());
    let details = match &e {
        StoreError::Validation(errors) => Some(errors.clone()),
        _ => None,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            details,
        }),
    )
}
