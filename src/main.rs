use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use beacon::capture::create_capture_router;
use beacon::config::{Config, StoreBackend};
use beacon::geo::{GeoLookup, IpApiClient, NoopGeoLookup};
use beacon::notify::{Notifier, NoopNotifier, TelegramNotifier};
use beacon::store::{EventStore, FileStore, SqliteStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize the event store
    let store: Arc<dyn EventStore> = match config.store.backend {
        StoreBackend::File => {
            info!("Using flat-file store in {}", config.store.data_dir);
            Arc::new(FileStore::new(&config.store.data_dir))
        }
        StoreBackend::Sqlite => {
            info!("Using SQLite store: {}", config.store.database_url);
            Arc::new(
                SqliteStore::new(&config.store.database_url, config.store.max_connections).await?,
            )
        }
    };
    store.init().await?;
    info!("Store initialized successfully");

    // Geolocation lookup
    let geo: Arc<dyn GeoLookup> = if config.geo.enabled {
        info!("🌍 Geolocation lookup enabled via {}", config.geo.endpoint);
        Arc::new(IpApiClient::new(
            &config.geo.endpoint,
            Duration::from_secs(config.geo.timeout_secs),
        )?)
    } else {
        info!("🌍 Geolocation lookup disabled");
        Arc::new(NoopGeoLookup)
    };

    // Notification delivery
    let notifier: Arc<dyn Notifier> = match (&config.notify.bot_token, &config.notify.chat_id) {
        (Some(token), Some(chat_id)) if config.notify.enabled => {
            info!("🔔 Telegram notifications enabled");
            Arc::new(TelegramNotifier::new(token.clone(), chat_id.clone())?)
        }
        _ => {
            info!("🔔 Notifications disabled");
            Arc::new(NoopNotifier)
        }
    };

    // One server carries both the capture endpoints and the JSON API
    let router = create_capture_router(Arc::clone(&store), geo, notifier)
        .merge(beacon::api::create_api_router(Arc::clone(&store)));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Beacon listening on http://{}", addr);
    info!("   - Tracking pixel at http://{}/t/<code>", addr);
    info!("   - Path capture at http://{}/p/<anything>", addr);
    info!("   - API endpoints at http://{}/api/...", addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
