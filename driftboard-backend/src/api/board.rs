use axum::{extract::State, response::Json};
use driftboard_core::types::BoardSnapshot;

use crate::state::AppState;

pub async fn get_board(State(state): State<AppState>) -> Json<BoardSnapshot> {
    Json(state.store.board())
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
