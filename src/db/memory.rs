use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use tokio::sync::RwLock;

use super::nodestore::{ensure_node_id, NodeStore, StoreFuture};
use crate::models::Node;

/// Node store kept in process memory.
///
/// Rows are keyed by their assigned id, so like the node table it may hold
/// several rows for one `node_id`. Used when no database URL is configured,
/// and by tests.
#[derive(Default)]
pub struct MemoryNodeStore {
    rows: RwLock<BTreeMap<i64, Node>>,
    next_id: AtomicI64,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest row for `node_id`.
    pub async fn get(&self, node_id: &str) -> Option<Node> {
        self.rows.read().await.values().find(|n| n.node_id == node_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    fn assign_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl NodeStore for MemoryNodeStore {
    fn create<'a>(&'a self, node: &'a Node) -> StoreFuture<'a, Node> {
        Box::pin(async move {
            ensure_node_id(node)?;
            let now = Utc::now();
            let mut stored = node.clone();
            stored.id = self.assign_id();
            stored.create_time = Some(now);
            stored.modify_time = Some(now);
            self.rows.write().await.insert(stored.id, stored.clone());
            Ok(stored)
        })
    }

    fn update<'a>(&'a self, node: &'a Node) -> StoreFuture<'a, Node> {
        Box::pin(async move {
            ensure_node_id(node)?;
            let now = Utc::now();
            let mut rows = self.rows.write().await;
            let mut first: Option<Node> = None;
            for row in rows.values_mut().filter(|n| n.node_id == node.node_id) {
                *row = Node {
                    id: row.id,
                    create_time: row.create_time,
                    modify_time: Some(now),
                    ..node.clone()
                };
                first.get_or_insert_with(|| row.clone());
            }
            if let Some(stored) = first {
                return Ok(stored);
            }

            let mut stored = node.clone();
            stored.id = self.assign_id();
            stored.create_time = Some(now);
            stored.modify_time = Some(now);
            rows.insert(stored.id, stored.clone());
            Ok(stored)
        })
    }

    fn delete<'a>(&'a self, node_id: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.rows.write().await.retain(|_, n| n.node_id != node_id);
            Ok(())
        })
    }

    fn list_by_document<'a>(&'a self, document_id: &'a str) -> StoreFuture<'a, Vec<Node>> {
        Box::pin(async move {
            let rows = self.rows.read().await;
            Ok(rows
                .values()
                .filter(|n| n.document_id == document_id)
                .cloned()
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(node_id: &str, document_id: &str) -> Node {
        Node {
            node_id: node_id.to_string(),
            document_id: document_id.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_stamps_times() {
        let store = MemoryNodeStore::new();
        let returned = store.create(&node("n1", "doc1")).await.unwrap();

        let stored = store.get("n1").await.unwrap();
        assert!(stored.id > 0);
        assert!(stored.create_time.is_some());
        assert_eq!(stored.create_time, stored.modify_time);
        assert_eq!(returned, stored);
    }

    #[tokio::test]
    async fn create_with_existing_node_id_adds_a_row() {
        let store = MemoryNodeStore::new();
        let first = store.create(&node("n1", "doc1")).await.unwrap();
        let second = store.create(&node("n1", "doc1")).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(store.get("n1").await.unwrap(), first);
        assert_eq!(store.list_by_document("doc1").await.unwrap().len(), 2);

        let mut changed = node("n1", "doc1");
        changed.cap_info = "x".to_string();
        store.update(&changed).await.unwrap();
        let rows = store.list_by_document("doc1").await.unwrap();
        assert!(rows.iter().all(|n| n.cap_info == "x"));

        store.delete("n1").await.unwrap();
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn update_overwrites_and_keeps_identity() {
        let store = MemoryNodeStore::new();
        store.create(&node("n1", "doc1")).await.unwrap();
        let created = store.get("n1").await.unwrap();

        let mut changed = node("n1", "doc1");
        changed.cap_info = "{\"text\":\"hi\"}".to_string();
        let returned = store.update(&changed).await.unwrap();

        let stored = store.get("n1").await.unwrap();
        assert_eq!(returned, stored);
        assert_eq!(stored.id, created.id);
        assert_eq!(stored.create_time, created.create_time);
        assert_eq!(stored.cap_info, "{\"text\":\"hi\"}");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn update_of_missing_node_inserts_it() {
        let store = MemoryNodeStore::new();
        store.update(&node("n9", "doc1")).await.unwrap();
        assert!(store.get("n9").await.is_some());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryNodeStore::new();
        store.create(&node("n1", "doc1")).await.unwrap();
        store.delete("n1").await.unwrap();
        store.delete("n1").await.unwrap();
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn list_filters_by_document() {
        let store = MemoryNodeStore::new();
        store.create(&node("a", "doc1")).await.unwrap();
        store.create(&node("b", "doc2")).await.unwrap();
        store.create(&node("c", "doc1")).await.unwrap();

        let ids: Vec<String> = store
            .list_by_document("doc1")
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.node_id)
            .collect();
        assert_eq!(ids, vec!["a".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn rejects_empty_node_id() {
        let store = MemoryNodeStore::new();
        assert!(store.create(&node("", "doc1")).await.is_err());
    }
}
