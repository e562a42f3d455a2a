//! Integration tests for the node HTTP API and health endpoints.

use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tenet_sync::config::Config;
use tenet_sync::db::MemoryNodeStore;
use tenet_sync::routes::build_router;
use tenet_sync::state::AppState;
use tokio::net::TcpListener;

async fn start_test_server() -> (SocketAddr, Arc<MemoryNodeStore>) {
    let store = Arc::new(MemoryNodeStore::new());
    let state = AppState::new(Config::default(), store.clone());
    let app = build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, store)
}

#[tokio::test]
async fn test_health() {
    let (addr, _) = start_test_server().await;
    let body = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_node_lifecycle() {
    let (addr, store) = start_test_server().await;
    let client = reqwest::Client::new();

    let created = client
        .post(format!("http://{addr}/api/node/create"))
        .json(&json!({"documentId": "doc1", "nodeId": "n1", "type": 3, "capInfo": "a"}))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), reqwest::StatusCode::OK);
    let created = created.json::<Value>().await.unwrap();
    assert!(created["id"].as_i64().unwrap() > 0);
    assert!(created["createTime"].is_string());
    assert_eq!(created["createTime"], created["modifyTime"]);

    let updated = client
        .put(format!("http://{addr}/api/node/update"))
        .json(&json!({"documentId": "doc1", "nodeId": "n1", "type": 3, "capInfo": "b"}))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status(), reqwest::StatusCode::OK);
    let updated = updated.json::<Value>().await.unwrap();
    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["createTime"], created["createTime"]);
    assert_eq!(updated["capInfo"], "b");

    let nodes = client
        .get(format!("http://{addr}/api/node/list/doc1"))
        .send()
        .await
        .unwrap()
        .json::<Vec<Value>>()
        .await
        .unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0]["nodeId"], "n1");
    assert_eq!(nodes[0]["capInfo"], "b");
    assert!(nodes[0]["createTime"].is_string());

    let deleted = client
        .delete(format!("http://{addr}/api/node/delete/n1"))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), reqwest::StatusCode::NO_CONTENT);
    assert_eq!(store.len().await, 0);
}

#[tokio::test]
async fn test_create_without_node_id_is_rejected() {
    let (addr, store) = start_test_server().await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/node/create"))
        .json(&json!({"documentId": "doc1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(store.len().await, 0);
}

#[tokio::test]
async fn test_openapi_lists_room_endpoint() {
    let (addr, _) = start_test_server().await;
    let spec = reqwest::get(format!("http://{addr}/api-docs/openapi.json"))
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert!(spec["paths"]["/api/room/{document_id}/users"].is_object());
}
