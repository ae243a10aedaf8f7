pub mod health;
pub mod proxy;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::relay::RelayService;

/// Builds the relay's HTTP front door around a relay service.
pub fn router(service: Arc<dyn RelayService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/proxy", post(proxy::proxy_request))
        .with_state(service)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
