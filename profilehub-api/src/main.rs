//! # ProfileHub API Server
//!
//! HTTP surface of the user-profile and account-management service:
//! registration, login, profile editing, password change, security-question
//! password recovery, per-site registration settings, and CSV export of
//! frontend users.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p profilehub-api
//! ```

use profilehub_api::{
    app::{build_router, AppState},
    config::Config,
};
use profilehub_shared::{
    db::{migrations, pool},
    models::site::Site,
    recovery::{AttemptStore, MemoryAttemptStore, RedisAttemptStore},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "profilehub_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "ProfileHub API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let db = pool::create_pool(pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    migrations::run_migrations(&db).await?;

    // Provision the default site (with its security-question index and
    // settings row) on first boot.
    let default_hostname = &config.api.default_site_hostname;
    if Site::find_by_hostname(&db, default_hostname).await?.is_none() {
        Site::create(&db, default_hostname, "Default site").await?;
        tracing::info!(hostname = %default_hostname, "Provisioned default site");
    }

    let attempts: Arc<dyn AttemptStore> = match &config.redis.url {
        Some(url) => {
            tracing::info!("Using Redis-backed recovery attempt store");
            Arc::new(RedisAttemptStore::connect(url).await?)
        }
        None => {
            tracing::warn!("REDIS_URL not set, using in-process recovery attempt store");
            Arc::new(MemoryAttemptStore::new())
        }
    };

    let bind_address = config.bind_address();
    let state = AppState::new(db, config, attempts);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
