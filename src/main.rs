//! inventory_sync - live product inventory mirror
//!
//! Connects to the configured store, keeps the products collection mirrored
//! locally and logs an inventory summary every time it changes.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inventory_sync::{store, Config, InventorySynchronizer, SyncState};

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inventory_sync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// One line per change: counts and total value, or the failure
async fn log_summary(synchronizer: &InventorySynchronizer) {
    let view = synchronizer.current().await;
    let stats = view.stats();

    match view.state() {
        SyncState::Ready => tracing::info!(
            products = stats.product_count,
            low_stock = stats.low_stock_count,
            threshold = view.low_stock_threshold(),
            total_value = %stats.formatted_total(),
            skipped = view.skipped_records(),
            "Inventory updated"
        ),
        SyncState::Error => tracing::warn!(
            error = ?view.last_error(),
            products = stats.product_count,
            "Inventory subscription failed, showing last known data"
        ),
        state => tracing::debug!(state = state.as_str(), "Inventory state changed"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!(
        backend = ?config.backend,
        path = %config.products_path,
        environment = %config.environment,
        "Starting inventory_sync"
    );

    let store = store::connect(&config)?;

    let mut synchronizer = InventorySynchronizer::from_config(store.clone(), &config);
    let mut changes = synchronizer.changes();
    synchronizer.start().await?;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                log_summary(&synchronizer).await;
            }
        }
    }

    // Cleanup
    tracing::info!("Shutting down...");
    synchronizer.stop().await;
    store.shutdown().await;
    tracing::info!("Subscription released. Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
