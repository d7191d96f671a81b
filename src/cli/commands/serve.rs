use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::app::{router, AppState};
use crate::config::AppConfig;
use crate::database::store::DocumentStore;
use crate::database::{DatabaseManager, MemoryStore, PgStore};
use crate::services::geocoder::MapQuestGeocoder;
use crate::services::mailer;

pub async fn handle(mut config: AppConfig, memory: bool, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set outside development");
    }

    let store: Arc<dyn DocumentStore> = if memory {
        tracing::warn!("using the in-memory store; data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        let pool = DatabaseManager::connect(&config.database).await?;
        DatabaseManager::migrate(&pool).await?;
        Arc::new(PgStore::new(pool))
    };

    if config.geocoder.api_key.is_none() {
        tracing::warn!("GEOCODER_API_KEY not set; bootcamp addresses cannot be geocoded");
    }
    let geocoder = Arc::new(MapQuestGeocoder::new(&config.geocoder));
    let mailer = mailer::from_config(&config.mail);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Starting bootcamp API in {:?} mode on http://{}", config.environment, addr);

    let app = router(AppState::new(config, store, geocoder, mailer));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
