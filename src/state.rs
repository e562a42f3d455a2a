use std::sync::Arc;

use crate::config::Config;
use crate::db::NodeStore;
use crate::ws::HubHandle;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the single room registry of this process
    pub hub: HubHandle,
    /// Node persistence used by sessions and the node API
    pub store: Arc<dyn NodeStore>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Start the hub control loop and bundle it with the store.
    pub fn new(config: Config, store: Arc<dyn NodeStore>) -> Self {
        let hub = crate::ws::Hub::spawn(config.hub_queue_capacity);
        AppState {
            hub,
            store,
            config: Arc::new(config),
        }
    }
}
