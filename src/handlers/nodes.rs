use axum::{extract::{Path, State}, http::StatusCode, Json};
use tracing::{error, info};

use crate::db::StoreError;
use crate::models::{ErrorResponse, Node};
use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn store_failure(action: &str, e: StoreError) -> ApiError {
    error!("Failed to {} node: {}", action, e);
    let status = match &e {
        StoreError::InvalidNode(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ErrorResponse::reply(status, e.to_string())
}

/// List the nodes of a document
pub async fn list_nodes(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<(StatusCode, Json<Vec<Node>>), ApiError> {
    let nodes = state
        .store
        .list_by_document(&document_id)
        .await
        .map_err(|e| store_failure("list", e))?;
    Ok((StatusCode::OK, Json(nodes)))
}

/// Create a node
pub async fn create_node(
    State(state): State<AppState>,
    Json(node): Json<Node>,
) -> Result<(StatusCode, Json<Node>), ApiError> {
    let stored = state.store.create(&node).await.map_err(|e| store_failure("create", e))?;
    info!("Node created over HTTP: {} in document: {}", stored.node_id, stored.document_id);
    Ok((StatusCode::OK, Json(stored)))
}

/// Update a node, inserting it if it does not exist yet
pub async fn update_node(
    State(state): State<AppState>,
    Json(node): Json<Node>,
) -> Result<(StatusCode, Json<Node>), ApiError> {
    let stored = state.store.update(&node).await.map_err(|e| store_failure("update", e))?;
    info!("Node updated over HTTP: {}", stored.node_id);
    Ok((StatusCode::OK, Json(stored)))
}

/// Delete a node
pub async fn delete_node(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(&node_id).await.map_err(|e| store_failure("delete", e))?;
    info!("Node deleted over HTTP: {}", node_id);
    Ok(StatusCode::NO_CONTENT)
}
