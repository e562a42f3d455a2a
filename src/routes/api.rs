use crate::{handlers::{create_node, delete_node, diagnostics, list_nodes, room_users, update_node}, state::AppState};
use axum::{routing::{delete, get, post, put}, Router};

/// Create API routes
pub fn create_api_routes(state: AppState) -> Router {
    Router::<AppState>::new()
        .route("/diagnostics", get(diagnostics))
        .route("/room/:document_id/users", get(room_users))
        .route("/node/list/:document_id", get(list_nodes))
        .route("/node/create", post(create_node))
        .route("/node/update", put(update_node))
        .route("/node/delete/:node_id", delete(delete_node))
        .with_state(state)
}
