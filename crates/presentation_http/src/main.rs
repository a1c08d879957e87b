//! PiHome dashboard server
//!
//! Serves the dashboard JSON endpoints over the solar, sensor, report and
//! quote databases, plus the weather and location lookups.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use application::ports::{SecretStorePort, StoreTarget, TableStoreFactory};
use application::{DashboardService, DbManager, WeatherService};
use infrastructure::{
    AppConfig, IpinfoAdapter, OpenWeatherAdapter, VaultSecretStore, init_logging, store_factory,
};
use presentation_http::{routes, serve_with_drain_timeout, state::AppState};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;

/// Name the dashboard connects to each database as
const APPLICATION_NAME: &str = "PiHomeWeb";

async fn open(stores: &dyn TableStoreFactory, database: &str) -> anyhow::Result<Arc<DbManager>> {
    let target = StoreTarget::new(database).with_application_name(APPLICATION_NAME);
    let store = stores
        .open(&target)
        .await
        .with_context(|| format!("Could not open the {database} database"))?;
    Ok(Arc::new(DbManager::new(store, target)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_logging(&config.logging)?;

    info!("PiHome dashboard v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.server.host,
        port = %config.server.port,
        "Configuration loaded"
    );

    let vault = VaultSecretStore::connect_with_retry(&config.vault)
        .await
        .context("Could not connect to vault")?;
    let secrets: Arc<dyn SecretStorePort> = Arc::new(vault);
    let stores = store_factory(&config.database, Arc::clone(&secrets))
        .await
        .context("Could not set up the database connections")?;

    let dashboard = DashboardService::new(
        open(stores.as_ref(), "solar").await?,
        open(stores.as_ref(), "sensor").await?,
        open(stores.as_ref(), "report").await?,
        open(stores.as_ref(), "quote").await?,
    );
    let forecasts = OpenWeatherAdapter::with_config(config.weather.clone(), Arc::clone(&secrets))
        .context("Could not set up the weather client")?;
    let locator = IpinfoAdapter::with_config(config.ipinfo.clone(), secrets)
        .context("Could not set up the location client")?;
    let weather = WeatherService::new(Arc::new(forecasts), Arc::new(locator));
    let state = AppState::new(Arc::new(dashboard), Arc::new(weather));

    let mut app = routes::create_router(state);
    if let Some(dir) = &config.server.static_dir {
        info!(dir = %dir, "Serving static files under /static");
        app = app.nest_service("/static", ServeDir::new(dir));
    }
    if config.server.cors_enabled {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }
    let app = app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_secs.unwrap_or(30));

    serve_with_drain_timeout(listener, app, shutdown_signal(), shutdown_timeout).await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
