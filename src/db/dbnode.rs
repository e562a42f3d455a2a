use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Error as SqlxError;
use std::time::Duration;
use tracing::{debug, error, info};

use super::nodestore::{ensure_node_id, NodeStore, StoreError, StoreFuture};
use crate::models::Node;

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS node_info (
        id BIGSERIAL PRIMARY KEY,
        document_id TEXT NOT NULL,
        node_id TEXT NOT NULL,
        parent_id TEXT NOT NULL DEFAULT '',
        type INTEGER NOT NULL DEFAULT 0,
        z_index REAL NOT NULL DEFAULT 0,
        create_time TIMESTAMPTZ,
        modify_time TIMESTAMPTZ,
        cap_info TEXT NOT NULL DEFAULT ''
    );
    CREATE INDEX IF NOT EXISTS node_info_document_idx ON node_info (document_id);
    CREATE INDEX IF NOT EXISTS node_info_node_idx ON node_info (node_id);
"#;

const NODE_COLUMNS: &str =
    "id, document_id, node_id, parent_id, type, z_index, create_time, modify_time, cap_info";

/// Postgres backed node store
pub struct PgNodeStore {
    pool: PgPool,
}

impl PgNodeStore {
    /// Create a new database connection pool and make sure the node table exists
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    pub async fn connect(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        sqlx::raw_sql(CREATE_TABLE_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    async fn insert(&self, node: &Node) -> Result<Node, SqlxError> {
        let now = Utc::now();
        sqlx::query_as::<_, Node>(&format!(
            r#"
            INSERT INTO node_info
                (document_id, node_id, parent_id, type, z_index, create_time, modify_time, cap_info)
            VALUES ($1, $2, $3, $4, $5, $6, $6, $7)
            RETURNING {NODE_COLUMNS}
            "#
        ))
        .bind(&node.document_id)
        .bind(&node.node_id)
        .bind(&node.parent_id)
        .bind(node.node_type)
        .bind(node.z_index)
        .bind(now)
        .bind(&node.cap_info)
        .fetch_one(&self.pool)
        .await
    }

    async fn upsert(&self, node: &Node) -> Result<Node, SqlxError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Node>(&format!(
            r#"
            UPDATE node_info
            SET document_id = $2, parent_id = $3, type = $4, z_index = $5, modify_time = $6, cap_info = $7
            WHERE node_id = $1
            RETURNING {NODE_COLUMNS}
            "#
        ))
        .bind(&node.node_id)
        .bind(&node.document_id)
        .bind(&node.parent_id)
        .bind(node.node_type)
        .bind(node.z_index)
        .bind(now)
        .bind(&node.cap_info)
        .fetch_all(&mut *tx)
        .await?;

        let stored = match updated.into_iter().min_by_key(|n| n.id) {
            Some(stored) => stored,
            None => {
                debug!("Node {} not found on update, inserting", node.node_id);
                sqlx::query_as::<_, Node>(&format!(
                    r#"
                    INSERT INTO node_info
                        (document_id, node_id, parent_id, type, z_index, create_time, modify_time, cap_info)
                    VALUES ($1, $2, $3, $4, $5, $6, $6, $7)
                    RETURNING {NODE_COLUMNS}
                    "#
                ))
                .bind(&node.document_id)
                .bind(&node.node_id)
                .bind(&node.parent_id)
                .bind(node.node_type)
                .bind(node.z_index)
                .bind(now)
                .bind(&node.cap_info)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        Ok(stored)
    }
}

impl NodeStore for PgNodeStore {
    fn create<'a>(&'a self, node: &'a Node) -> StoreFuture<'a, Node> {
        Box::pin(async move {
            ensure_node_id(node)?;
            self.insert(node).await.map_err(|e| {
                error!("Failed to insert node '{}': {}", node.node_id, e);
                StoreError::from(e)
            })
        })
    }

    fn update<'a>(&'a self, node: &'a Node) -> StoreFuture<'a, Node> {
        Box::pin(async move {
            ensure_node_id(node)?;
            self.upsert(node).await.map_err(|e| {
                error!("Failed to update node '{}': {}", node.node_id, e);
                StoreError::from(e)
            })
        })
    }

    fn delete<'a>(&'a self, node_id: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query("DELETE FROM node_info WHERE node_id = $1")
                .bind(node_id)
                .execute(&self.pool)
                .await?;
            Ok(())
        })
    }

    fn list_by_document<'a>(&'a self, document_id: &'a str) -> StoreFuture<'a, Vec<Node>> {
        Box::pin(async move {
            let nodes = sqlx::query_as::<_, Node>(&format!(
                "SELECT {NODE_COLUMNS} FROM node_info WHERE document_id = $1 ORDER BY id"
            ))
            .bind(document_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(nodes)
        })
    }
}
