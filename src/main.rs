use std::panic;
use std::sync::Arc;

use tenet_sync::config::Config;
use tenet_sync::db::{MemoryNodeStore, NodeStore, PgNodeStore};
use tenet_sync::routes::build_router;
use tenet_sync::state::AppState;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Load configuration before tracing so the configured level can be applied
    let config_result = Config::load();
    let log_level = config_result
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("tenet_sync={log_level},tower_http=debug,info").into()
        }))
        .init();

    info!("Starting server...");

    let config = match config_result {
        Ok(config) => {
            info!("✅ Configuration loaded successfully");
            config
        }
        Err(e) => {
            error!("❌ Failed to load configuration: {}", e);
            warn!("Using default configuration");
            Config::default()
        }
    };
    if config.is_development() {
        info!("Running in development mode");
    }

    // Pick the node store
    let store: Arc<dyn NodeStore> = match &config.db_url {
        Some(db_url) => match PgNodeStore::connect(db_url).await {
            Ok(store) => {
                info!("Database initialized successfully");
                Arc::new(store)
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                warn!("Falling back to in-memory node store, edits will not survive a restart");
                Arc::new(MemoryNodeStore::new())
            }
        },
        None => {
            warn!("No database URL configured - nodes are kept in memory");
            Arc::new(MemoryNodeStore::new())
        }
    };

    let address = config.server_address();
    let state = AppState::new(config, store);
    let app_routes = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", address));

    info!("🚀 Server running on http://{}", address);
    info!("📡 WebSocket available at ws://{}/ws?documentId=..&userId=..", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}
