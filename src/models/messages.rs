use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Node;

/// Kind of operation carried in `MessageMeta.type`.
///
/// Unrecognized tags decode into `Unknown` instead of failing, so newer clients
/// can send operation kinds this server only relays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationKind {
    NodeCreate,
    NodeUpdate,
    NodeDelete,
    UserJoin,
    UserLeave,
    Unknown(String),
}

impl OperationKind {
    pub fn as_str(&self) -> &str {
        match self {
            OperationKind::NodeCreate => "node_create",
            OperationKind::NodeUpdate => "node_update",
            OperationKind::NodeDelete => "node_delete",
            OperationKind::UserJoin => "user_join",
            OperationKind::UserLeave => "user_leave",
            OperationKind::Unknown(tag) => tag,
        }
    }
}

impl From<String> for OperationKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "node_create" => OperationKind::NodeCreate,
            "node_update" => OperationKind::NodeUpdate,
            "node_delete" => OperationKind::NodeDelete,
            "user_join" => OperationKind::UserJoin,
            "user_leave" => OperationKind::UserLeave,
            _ => OperationKind::Unknown(tag),
        }
    }
}

impl From<OperationKind> for String {
    fn from(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Unknown(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

impl Default for OperationKind {
    fn default() -> Self {
        OperationKind::Unknown(String::new())
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageMeta {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub op_id: String,
    #[serde(rename = "type", default)]
    pub kind: OperationKind,
    /// Streaming messages are relayed to the room but never persisted.
    #[serde(default)]
    pub streaming: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MessageData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<Node>,
}

/// Operation message exchanged over a session connection, one per frame.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub meta: MessageMeta,
    #[serde(default)]
    pub data: MessageData,
}

impl Message {
    /// Presence event synthesized by the hub. Carries no payload.
    pub fn presence(kind: OperationKind, user_id: &str, document_id: &str) -> Self {
        Message {
            meta: MessageMeta {
                user_id: user_id.to_string(),
                document_id: document_id.to_string(),
                kind,
                ..Default::default()
            },
            data: MessageData::default(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        !self.meta.streaming
    }
}

/// Receipt for one operation, sent only to the session that submitted it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    pub op_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Ack {
    pub fn for_result<E: fmt::Display>(op_id: &str, result: &Result<(), E>) -> Self {
        Ack {
            op_id: op_id.to_string(),
            success: result.is_ok(),
            error: result.as_ref().err().map(|e| e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_node_create_with_payload() {
        let raw = r#"{
            "meta": {"userId": "u1", "documentId": "doc1", "opId": "op-1", "type": "node_create", "streaming": false},
            "data": {"node": {"nodeId": "n1", "parentId": "root", "type": 2, "zIndex": 1.5, "capInfo": "{}"}}
        }"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.meta.kind, OperationKind::NodeCreate);
        assert_eq!(msg.meta.op_id, "op-1");
        assert!(msg.is_persisted());
        let node = msg.data.node.unwrap();
        assert_eq!(node.node_id, "n1");
        assert_eq!(node.node_type, 2);
    }

    #[test]
    fn unknown_type_is_not_a_decode_error() {
        let raw = r#"{"meta": {"type": "cursor_move", "streaming": true}}"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.meta.kind, OperationKind::Unknown("cursor_move".to_string()));
        assert!(msg.data.node.is_none());

        let out = serde_json::to_value(&msg).unwrap();
        assert_eq!(out["meta"]["type"], "cursor_move");
    }

    #[test]
    fn missing_meta_is_rejected() {
        assert!(serde_json::from_str::<Message>(r#"{"data": {}}"#).is_err());
        assert!(serde_json::from_str::<Message>("not json").is_err());
    }

    #[test]
    fn presence_event_has_no_payload() {
        let msg = Message::presence(OperationKind::UserJoin, "alice", "doc1");
        let out = serde_json::to_value(&msg).unwrap();
        assert_eq!(out["meta"]["type"], "user_join");
        assert_eq!(out["meta"]["userId"], "alice");
        assert_eq!(out["meta"]["documentId"], "doc1");
        assert!(out["data"].get("node").is_none());
    }

    #[test]
    fn ack_omits_error_on_success() {
        let ok: Result<(), String> = Ok(());
        let out = serde_json::to_value(Ack::for_result("op-7", &ok)).unwrap();
        assert_eq!(out, serde_json::json!({"opId": "op-7", "success": true}));

        let failed: Result<(), String> = Err("disk full".to_string());
        let ack = Ack::for_result("op-8", &failed);
        assert!(!ack.success);
        assert_eq!(ack.error.as_deref(), Some("disk full"));
    }
}
