use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lease_reconciler::config::Config;
use lease_reconciler::db::seeds::TopologySeed;
use lease_reconciler::db::Store;
use lease_reconciler::dhcp::EventSpool;
use lease_reconciler::LeaseProcessor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lease_reconciler=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::load();
    tracing::info!("Starting lease reconciler");
    tracing::info!("Database: {}", cfg.db_path);
    tracing::info!("Event spool: {}", cfg.event_spool_path);

    // Initialize database
    let store = Arc::new(Store::with_pool_size(&cfg.db_path, cfg.db_max_connections).await?);
    tracing::info!("Database initialized (pool_size={})", cfg.db_max_connections);

    if let Some(seed_path) = &cfg.seed_path {
        let seed = TopologySeed::load(Path::new(seed_path))?;
        store.apply_seed(&seed).await?;
    }

    let processor = Arc::new(LeaseProcessor::with_backend(store));

    let mut spool = EventSpool::new(cfg.event_spool_path.clone(), cfg.spool_poll_interval, processor);
    spool.start();
    tracing::info!("Event spool watcher started (every {:?})", cfg.spool_poll_interval);

    shutdown_signal().await;
    tracing::info!("Shutting down");
    spool.stop();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => { sig.recv().await; }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
