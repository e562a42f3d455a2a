use std::sync::Arc;

use tracing::{info, warn, error};

use crate::db::{NodeStore, StoreError};
use crate::models::{Message, OperationKind};

/// Applies persisted operations to the node store.
///
/// Malformed or unknown operations are logged and reported as success so a
/// bad client message never tears down its session or stalls the room.
#[derive(Clone)]
pub struct MessageHandler {
    store: Arc<dyn NodeStore>,
}

impl MessageHandler {
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        MessageHandler { store }
    }

    /// Handle one operation. The store's error is returned untouched.
    ///
    /// `node_create` stamps the node with the message's document id, so the
    /// caller broadcasts the stamped node.
    pub async fn handle(&self, msg: &mut Message) -> Result<(), StoreError> {
        match msg.meta.kind.clone() {
            OperationKind::NodeCreate => self.handle_node_create(msg).await,
            OperationKind::NodeUpdate => self.handle_node_update(msg).await,
            OperationKind::NodeDelete => self.handle_node_delete(msg).await,
            other => {
                warn!("Unknown message type: {}", other);
                Ok(())
            }
        }
    }

    async fn handle_node_create(&self, msg: &mut Message) -> Result<(), StoreError> {
        let document_id = msg.meta.document_id.clone();
        let Some(node) = msg.data.node.as_mut() else {
            warn!("node_create: node is missing (op {})", msg.meta.op_id);
            return Ok(());
        };
        node.document_id = document_id;

        if let Err(e) = self.store.create(node).await {
            error!("Failed to create node {}: {}", node.node_id, e);
            return Err(e);
        }
        info!("Node created: {} in document: {}", node.node_id, node.document_id);
        Ok(())
    }

    async fn handle_node_update(&self, msg: &mut Message) -> Result<(), StoreError> {
        let Some(node) = msg.data.node.as_ref() else {
            warn!("node_update: node is missing (op {})", msg.meta.op_id);
            return Ok(());
        };

        if let Err(e) = self.store.update(node).await {
            error!("Failed to update node {}: {}", node.node_id, e);
            return Err(e);
        }
        info!("Node updated: {}", node.node_id);
        Ok(())
    }

    async fn handle_node_delete(&self, msg: &mut Message) -> Result<(), StoreError> {
        let node_id = match msg.data.node.as_ref() {
            Some(node) if !node.node_id.is_empty() => node.node_id.as_str(),
            _ => {
                warn!("node_delete: nodeId is empty (op {})", msg.meta.op_id);
                return Ok(());
            }
        };

        if let Err(e) = self.store.delete(node_id).await {
            error!("Failed to delete node {}: {}", node_id, e);
            return Err(e);
        }
        info!("Node deleted: {}", node_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryNodeStore, StoreFuture};
    use crate::models::{MessageData, MessageMeta, Node};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and optionally fails every one of them.
    #[derive(Default)]
    struct RecordingStore {
        calls: AtomicUsize,
        fail: bool,
        last_document: std::sync::Mutex<Option<String>>,
    }

    impl RecordingStore {
        fn record(&self, document_id: Option<&str>) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(doc) = document_id {
                *self.last_document.lock().unwrap() = Some(doc.to_string());
            }
            if self.fail {
                Err(StoreError::from(sqlx::Error::PoolTimedOut))
            } else {
                Ok(())
            }
        }
    }

    impl NodeStore for RecordingStore {
        fn create<'a>(&'a self, node: &'a Node) -> StoreFuture<'a, Node> {
            Box::pin(async move { self.record(Some(&node.document_id)).map(|_| node.clone()) })
        }
        fn update<'a>(&'a self, node: &'a Node) -> StoreFuture<'a, Node> {
            Box::pin(async move { self.record(Some(&node.document_id)).map(|_| node.clone()) })
        }
        fn delete<'a>(&'a self, _node_id: &'a str) -> StoreFuture<'a, ()> {
            Box::pin(async move { self.record(None) })
        }
        fn list_by_document<'a>(&'a self, _document_id: &'a str) -> StoreFuture<'a, Vec<Node>> {
            Box::pin(async move { Ok::<_, StoreError>(Vec::new()) })
        }
    }

    fn message(kind: OperationKind, node: Option<Node>) -> Message {
        Message {
            meta: MessageMeta {
                user_id: "alice".to_string(),
                document_id: "doc1".to_string(),
                op_id: "op-1".to_string(),
                kind,
                streaming: false,
            },
            data: MessageData { node },
        }
    }

    fn node(node_id: &str) -> Node {
        Node { node_id: node_id.to_string(), ..Default::default() }
    }

    #[tokio::test]
    async fn create_stamps_document_id() {
        let store = Arc::new(RecordingStore::default());
        let handler = MessageHandler::new(store.clone());

        let mut msg = message(OperationKind::NodeCreate, Some(node("n1")));
        handler.handle(&mut msg).await.unwrap();

        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.last_document.lock().unwrap().as_deref(), Some("doc1"));
        assert_eq!(msg.data.node.unwrap().document_id, "doc1");
    }

    #[tokio::test]
    async fn create_reaches_memory_store() {
        let store = Arc::new(MemoryNodeStore::new());
        let handler = MessageHandler::new(store.clone());

        handler.handle(&mut message(OperationKind::NodeCreate, Some(node("n1")))).await.unwrap();
        handler.handle(&mut message(OperationKind::NodeDelete, Some(node("n1")))).await.unwrap();
        assert!(store.get("n1").await.is_none());
    }

    #[tokio::test]
    async fn missing_payload_is_a_no_op() {
        let store = Arc::new(RecordingStore::default());
        let handler = MessageHandler::new(store.clone());

        for kind in [OperationKind::NodeCreate, OperationKind::NodeUpdate, OperationKind::NodeDelete] {
            handler.handle(&mut message(kind, None)).await.unwrap();
        }
        handler.handle(&mut message(OperationKind::NodeDelete, Some(node("")))).await.unwrap();
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_type_is_a_no_op() {
        let store = Arc::new(RecordingStore::default());
        let handler = MessageHandler::new(store.clone());

        let mut msg = message(OperationKind::Unknown("cursor".to_string()), Some(node("n1")));
        handler.handle(&mut msg).await.unwrap();
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn store_error_is_returned() {
        let store = Arc::new(RecordingStore { fail: true, ..Default::default() });
        let handler = MessageHandler::new(store.clone());

        let err = handler
            .handle(&mut message(OperationKind::NodeUpdate, Some(node("n1"))))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Database(sqlx::Error::PoolTimedOut)));
    }
}
