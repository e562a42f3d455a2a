use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::models::ErrorResponse;
use crate::state::AppState;
use crate::ws::{run_session, MessageHandler, SessionInfo, SessionSettings};

/// Query parameters for WebSocket connection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectQuery {
    pub document_id: Option<String>,
    pub user_id: Option<String>,
}

/// GET /ws?documentId=..&userId=..
///
/// Both parameters are checked before the upgrade is attempted, so a request
/// missing either one gets a 400 even if it is not an upgrade request.
pub async fn ws_connect(
    State(state): State<AppState>,
    Query(params): Query<ConnectQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let document_id = params.document_id.filter(|d| !d.is_empty());
    let user_id = params.user_id.filter(|u| !u.is_empty());
    let (Some(document_id), Some(user_id)) = (document_id, user_id) else {
        warn!("WebSocket connection rejected: missing documentId or userId");
        return ErrorResponse::reply(StatusCode::BAD_REQUEST, "missing documentId or userId parameter")
            .into_response();
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    info!("New WebSocket connection for document {} (user: {})", document_id, user_id);
    let settings = SessionSettings::from(state.config.as_ref());
    let handler = MessageHandler::new(state.store.clone());
    let hub = state.hub.clone();

    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| {
            run_session(socket, SessionInfo::new(document_id, user_id), hub, handler, settings)
        })
}
