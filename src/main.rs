//! Mobile Store - phone and accessory shop backend

use anyhow::{Context, Result};
use chrono::Duration;
use mobile_store::api::{self, AppState};
use mobile_store::auth::TokenIssuer;
use mobile_store::config::Config;
use mobile_store::events::EventPublisher;
use mobile_store::services::Services;
use mobile_store::storage::{MemoryStorage, PgStorage, Storage};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::debug!(?config, "configuration loaded");

    let storage: Arc<dyn Storage> = match &config.database_url {
        Some(url) => Arc::new(
            PgStorage::connect(url, config.database_max_connections)
                .await
                .context("failed to initialise postgres storage")?,
        ),
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory storage, data will not survive a restart");
            Arc::new(MemoryStorage::new())
        }
    };

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable; domain events will not be published");
                None
            }
        },
        None => None,
    };

    let tokens = TokenIssuer::new(
        config.jwt_secret.as_bytes(),
        Duration::minutes(config.jwt_access_ttl_minutes),
        Duration::minutes(config.jwt_refresh_ttl_minutes),
    );
    let services = Services::new(storage.clone(), EventPublisher::new(nats), tokens);

    if let Some(admin) = &config.admin {
        services
            .customers
            .ensure_staff_account(&admin.email, &admin.password)
            .await
            .context("failed to bootstrap the staff account")?;
    }
    if config.seed_sample_data {
        services.catalog.seed_sample_data().await.context("failed to load the sample catalog")?;
    }

    let app = api::router(AppState { services, storage });

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Mobile Store listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
