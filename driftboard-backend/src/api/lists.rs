use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use driftboard_core::types::{List, ListPatch};

use super::{store_error, ErrorResponse};
use crate::state::AppState;

pub async fn create_list(
    State(state): State<AppState>,
    Json(list): Json<List>,
) -> Result<(StatusCode, Json<List>), (StatusCode, Json<ErrorResponse>)> {
    let created = state
        .store
        .create_list(list)
        .map_err(|e| store_error("driftboard.api.create_list", e))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<ListPatch>,
) -> Result<Json<List>, (StatusCode, Json<ErrorResponse>)> {
    let updated = state
        .store
        .update_list(&id, &patch)
        .map_err(|e| store_error("driftboard.api.update_list", e))?;
    Ok(Json(updated))
}

pub async fn delete_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    state
        .store
        .delete_list(&id)
        .map_err(|e| store_error("driftboard.api.delete_list", e))?;
    Ok(StatusCode::NO_CONTENT)
}
