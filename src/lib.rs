pub mod chat;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod schema;
pub mod store;
pub mod utils;
pub mod ws_registry;

#[cfg(test)]
mod test_support;

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::chat::ChatHub;
use crate::metrics::Metrics;
use crate::store::MessageStore;
use crate::utils::auth::TokenVerifier;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MessageStore>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub chat: Arc<ChatHub>,
    pub metrics: Arc<Metrics>,
    pub history_limit: i64,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .route("/api/chat/messages", get(handlers::messages::get_recent_messages))
        .route("/api/chat/direct/{peer_id}", get(handlers::messages::get_direct_history))
        .route("/ws", get(handlers::ws::ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics_text(State(state): State<AppState>) -> Result<String, (StatusCode, &'static str)> {
    state.metrics.render().map_err(|e| {
        tracing::error!("render metrics: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render metrics")
    })
}
