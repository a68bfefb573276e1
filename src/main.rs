use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use comfort_service::{
    api::{self, AppState},
    clock::{Clock, SystemClock},
    config::Config,
    db,
    rollup::RollupScheduler,
    simulator::ReadingGenerator,
    store::{seed_sample_properties, MemoryReadingStore, PgReadingStore, SharedStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env (ignore error if file absent; env vars may be set externally)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    let store: SharedStore = match &config.database_url {
        Some(url) => {
            let pool = db::connect_and_migrate(url)
                .await
                .context("failed to prepare database")?;
            Arc::new(PgReadingStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set; readings are kept in memory only");
            Arc::new(MemoryReadingStore::new())
        }
    };

    if config.seed_properties {
        seed_sample_properties(store.as_ref())
            .await
            .context("failed to seed sample properties")?;
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let mut generator = ReadingGenerator::new(store.clone(), clock.clone());
    if config.simulator_enabled {
        generator.start();
    }

    let mut scheduler = RollupScheduler::new(
        store.clone(),
        clock.clone(),
        Duration::from_secs(config.rollup_poll_interval_secs),
        config.rollup_catch_up,
    );
    scheduler.start();

    let state = AppState::new(store, clock, config.history_window_days);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "HTTP server listening");

    let served = axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Let an in-flight rollup finish before exiting.
    generator.stop().await;
    scheduler.stop().await;

    served?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
