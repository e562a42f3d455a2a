use std::future::Future;
use std::pin::Pin;

use crate::models::Node;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid node: {0}")]
    InvalidNode(String),
}

/// Persistence for document nodes. Last write wins; no merging happens here.
pub trait NodeStore: Send + Sync {
    /// Insert a new row for the node, stamping its create and modify times.
    /// An existing row with the same `node_id` is left alone.
    fn create<'a>(&'a self, node: &'a Node) -> StoreFuture<'a, Node>;

    /// Overwrite every row with the same `node_id`, inserting one if absent.
    /// Returns the stored row.
    fn update<'a>(&'a self, node: &'a Node) -> StoreFuture<'a, Node>;

    /// Remove every node with this id. Removing a missing node is not an error.
    fn delete<'a>(&'a self, node_id: &'a str) -> StoreFuture<'a, ()>;

    fn list_by_document<'a>(&'a self, document_id: &'a str) -> StoreFuture<'a, Vec<Node>>;
}

pub(crate) fn ensure_node_id(node: &Node) -> Result<(), StoreError> {
    if node.node_id.is_empty() {
        return Err(StoreError::InvalidNode("nodeId is empty".to_string()));
    }
    Ok(())
}
