//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::RegistryError,
    infrastructure::dto::{
        conversion,
        http::{RoomDetailDto, RoomSummaryDto},
    },
    ui::state::AppState,
    usecase::CoordinatorError,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get list of rooms
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let rooms = state.room_query_usecase.list().await;

    // Domain Model から DTO への変換
    Json(rooms.iter().map(conversion::room_summary).collect())
}

/// Get room detail by ID
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDetailDto>, StatusCode> {
    match state.room_query_usecase.detail(room_id).await {
        Ok((room, members)) => Ok(Json(conversion::room_detail(&room, &members))),
        Err(CoordinatorError::Registry(RegistryError::RoomNotFound(_))) => {
            Err(StatusCode::NOT_FOUND)
        }
        Err(CoordinatorError::Validation(_)) => Err(StatusCode::BAD_REQUEST),
        Err(e) => {
            tracing::error!("Failed to load room detail: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
