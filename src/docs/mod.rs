use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Users connected to a document room
#[utoipa::path(
    get,
    path = "/api/room/{document_id}/users",
    params(("document_id" = String, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "Current room roster", body = RoomUsersResponse),
        (status = 503, description = "Room registry unavailable", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn room_users_doc() {}

/// Nodes of a document
#[utoipa::path(
    get,
    path = "/api/node/list/{document_id}",
    params(("document_id" = String, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "Nodes of the document", body = [Node]),
        (status = 500, description = "Node store failure", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn list_nodes_doc() {}

/// Create a node
#[utoipa::path(
    post,
    path = "/api/node/create",
    request_body = Node,
    responses(
        (status = 200, description = "Node created", body = Node),
        (status = 400, description = "Invalid node", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn create_node_doc() {}

/// Update a node
#[utoipa::path(
    put,
    path = "/api/node/update",
    request_body = Node,
    responses(
        (status = 200, description = "Node updated", body = Node),
        (status = 400, description = "Invalid node", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn update_node_doc() {}

/// Delete a node
#[utoipa::path(
    delete,
    path = "/api/node/delete/{node_id}",
    params(("node_id" = String, Path, description = "Node identifier")),
    responses(
        (status = 204, description = "Node deleted"),
        (status = 500, description = "Node store failure", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn delete_node_doc() {}

/// Process diagnostics
#[utoipa::path(
    get,
    path = "/api/diagnostics",
    responses(
        (status = 200, description = "Room, connection and resource counters", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        room_users_doc,
        list_nodes_doc,
        create_node_doc,
        update_node_doc,
        delete_node_doc,
        diagnostics_doc,
    ),
    components(
        schemas(HealthResponse, ErrorResponse, RoomUser, RoomUsersResponse, Node, DiagnosticsResponse)
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
