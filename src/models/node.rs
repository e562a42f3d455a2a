use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Structural node of a document.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Default, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub node_id: String,
    #[serde(default)]
    pub parent_id: String,
    #[serde(rename = "type", default)]
    #[sqlx(rename = "type")]
    pub node_type: i32,
    #[serde(default)]
    pub z_index: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modify_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cap_info: String,
}
