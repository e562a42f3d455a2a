use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One connected session in a room roster
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomUser {
    pub user_id: String,
    pub client_id: String,
}

/// Response for the room roster query
#[derive(Serialize, Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomUsersResponse {
    pub document_id: String,
    pub user_count: usize,
    pub users: Vec<RoomUser>,
}
