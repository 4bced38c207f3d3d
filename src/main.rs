use std::sync::Arc;

use skyline_chat_backend::chat::ChatHub;
use skyline_chat_backend::config::Config;
use skyline_chat_backend::metrics::Metrics;
use skyline_chat_backend::store::PgStore;
use skyline_chat_backend::utils::auth::{JwtVerifier, TokenVerifier};
use skyline_chat_backend::{build_router, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let config = Config::from_env()?;

    let store = Arc::new(PgStore::connect(&config.database_url)?);
    store.run_migrations()?;

    let metrics = Arc::new(Metrics::new().map_err(|e| e.to_string())?);
    let verifier: Arc<dyn TokenVerifier> =
        Arc::new(JwtVerifier::new(&config.jwt_secret, store.clone()));
    let chat = Arc::new(ChatHub::new(
        verifier.clone(),
        store.clone(),
        metrics.clone(),
        config.max_message_len,
    ));

    let state = AppState {
        store,
        verifier,
        chat,
        metrics,
        history_limit: config.history_limit,
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
