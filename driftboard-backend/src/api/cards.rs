use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use driftboard_core::types::{Card, CardPatch};
use serde::Deserialize;

use super::{store_error, ErrorResponse};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCardBody {
    target_list_id: String,
    target_index: usize,
}

pub async fn create_card(
    State(state): State<AppState>,
    Json(card): Json<Card>,
) -> Result<(StatusCode, Json<Card>), (StatusCode, Json<ErrorResponse>)> {
    let created = state
        .store
        .create_card(card)
        .map_err(|e| store_error("driftboard.api.create_card", e))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<CardPatch>,
) -> Result<Json<Card>, (StatusCode, Json<ErrorResponse>)> {
    let updated = state
        .store
        .update_card(&id, &patch)
        .map_err(|e| store_error("driftboard.api.update_card", e))?;
    Ok(Json(updated))
}

pub async fn delete_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    state
        .store
        .delete_card(&id)
        .map_err(|e| store_error("driftboard.api.delete_card", e))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn move_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<MoveCardBody>,
) -> Result<Json<Card>, (StatusCode, Json<ErrorResponse>)> {
    let moved = state
        .store
        .move_card(&id, &body.target_list_id, body.target_index)
        .map_err(|e| store_error("driftboard.api.move_card", e))?;
    Ok(Json(moved))
}
