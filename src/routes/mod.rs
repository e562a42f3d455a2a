pub mod api;

use axum::{http::HeaderValue, routing::get, Router};
use tower_http::{cors::{AllowOrigin, CorsLayer}, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::docs::ApiDoc;
use crate::handlers::{health_check, ws_connect};
use crate::state::AppState;

pub use api::create_api_routes;

/// Assemble the full application router.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin_list());

    let ws_routes = Router::<AppState>::new()
        .route("/ws", get(ws_connect))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health_check))
        .merge(ws_routes)
        .nest("/api", create_api_routes(state))
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
