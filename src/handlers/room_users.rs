use axum::{extract::{Path, State}, http::StatusCode, Json};
use tracing::{debug, error};

use crate::models::{ErrorResponse, RoomUsersResponse};
use crate::state::AppState;

/// List the sessions currently connected to a document
pub async fn room_users(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<(StatusCode, Json<RoomUsersResponse>), (StatusCode, Json<ErrorResponse>)> {

    if document_id.trim().is_empty() {
        return Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, "missing documentId parameter"));
    }

    let users = state.hub.room_members(&document_id).await.map_err(|e| {
        error!("Failed to query room {}: {}", document_id, e);
        ErrorResponse::reply(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
    })?;
    debug!("Room {} has {} users", document_id, users.len());

    Ok((
        StatusCode::OK,
        Json(RoomUsersResponse {
            document_id,
            user_count: users.len(),
            users,
        }),
    ))
}
