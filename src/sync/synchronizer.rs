//! Inventory Synchronizer
//!
//! Owns the single collection subscription of a session and pumps its events
//! into a shared `InventoryView`. Each event is applied to completion before
//! the next one is read. Stopping (or dropping) the synchronizer cancels the
//! subscription; anything delivered after that is discarded. A pump that ends
//! without being cancelled (stream closed, or a panic while applying an event)
//! leaves the view in `Error`.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use super::view::{AggregateStats, InventoryView, StockFilter, SyncState};
use crate::config::Config;
use crate::domain::Product;
use crate::error::{AppError, AppResult};
use crate::store::{CancelHandle, RemoteStore, StoreEvent, StoreFailure, Subscription};

/// Subscription currently owned by the synchronizer
struct ActiveSubscription {
    cancel: CancelHandle,
    pump: JoinHandle<()>,
}

/// Mirrors one remote collection into local state
pub struct InventorySynchronizer {
    store: Arc<dyn RemoteStore>,
    path: String,
    view: Arc<RwLock<InventoryView>>,
    revision: Arc<watch::Sender<u64>>,
    active: Option<ActiveSubscription>,
}

impl InventorySynchronizer {
    /// Create a synchronizer for the collection at `path`
    pub fn new(store: Arc<dyn RemoteStore>, path: impl Into<String>, low_stock_threshold: u32) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            store,
            path: path.into(),
            view: Arc::new(RwLock::new(InventoryView::new(low_stock_threshold))),
            revision: Arc::new(revision),
            active: None,
        }
    }

    /// Create a synchronizer for the configured products collection
    pub fn from_config(store: Arc<dyn RemoteStore>, config: &Config) -> Self {
        Self::new(store, config.products_path.clone(), config.low_stock_threshold)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Subscribe and start applying events.
    ///
    /// A no-op while a subscription is loading or ready. From `Error`, after
    /// `stop`, or once the pump has exited, a fresh subscription is opened.
    pub async fn start(&mut self) -> AppResult<()> {
        let state = self.view.read().await.state();
        let pumping = self
            .active
            .as_ref()
            .is_some_and(|active| !active.pump.is_finished());
        if pumping && matches!(state, SyncState::Loading | SyncState::Ready) {
            tracing::debug!(path = %self.path, state = state.as_str(), "Already subscribed");
            return Ok(());
        }

        // A failed subscription may still hold its pump
        self.release().await;

        self.update_view(|view| view.begin_loading()).await;
        tracing::info!(path = %self.path, "Subscribing to inventory");

        match self.store.subscribe_collection(&self.path).await {
            Ok(subscription) => {
                let cancel = subscription.cancel_handle();
                let pump = tokio::spawn(run_pump(
                    subscription,
                    Arc::clone(&self.view),
                    Arc::clone(&self.revision),
                ));
                self.active = Some(ActiveSubscription { cancel, pump });
                Ok(())
            }
            Err(failure) => {
                let reported = failure.clone();
                self.update_view(move |view| view.apply_error(reported)).await;
                Err(AppError::Subscription(failure))
            }
        }
    }

    /// Drop the current subscription, whatever its state, and open a new one
    pub async fn restart(&mut self) -> AppResult<()> {
        tracing::info!(path = %self.path, "Restarting inventory subscription");
        self.stop().await;
        self.start().await
    }

    /// Cancel the subscription. Safe to call at any time, repeatedly.
    pub async fn stop(&mut self) {
        if self.active.is_none() {
            return;
        }
        self.release().await;
        self.update_view(|view| view.reset_state()).await;
        tracing::info!(path = %self.path, "Inventory subscription stopped");
    }

    async fn release(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        active.cancel.cancel();
        // Wait out an event that is being applied right now; later ones see the cancel
        drop(self.view.write().await);
        active.pump.abort();
    }

    async fn update_view<F>(&self, update: F)
    where
        F: FnOnce(&mut InventoryView),
    {
        update(&mut *self.view.write().await);
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Receiver that is notified after every change to the view
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Number of changes applied so far
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Wait until `predicate` holds for the view and return a copy of it
    pub async fn wait_for<P>(&self, mut predicate: P) -> InventoryView
    where
        P: FnMut(&InventoryView) -> bool,
    {
        let mut changes = self.revision.subscribe();
        loop {
            {
                let view = self.view.read().await;
                if predicate(&*view) {
                    return view.clone();
                }
            }
            if changes.changed().await.is_err() {
                return self.view.read().await.clone();
            }
        }
    }

    /// Copy of the current view
    pub async fn current(&self) -> InventoryView {
        self.view.read().await.clone()
    }

    pub async fn state(&self) -> SyncState {
        self.view.read().await.state()
    }

    pub async fn stats(&self) -> AggregateStats {
        self.view.read().await.stats()
    }

    /// Products of the current snapshot matching `predicate`
    pub async fn filtered_view<P>(&self, predicate: P) -> Vec<Product>
    where
        P: Fn(&Product) -> bool,
    {
        self.view.read().await.filtered_view(predicate)
    }

    pub async fn filtered(&self, filter: StockFilter) -> Vec<Product> {
        self.view.read().await.filtered(filter)
    }
}

impl Drop for InventorySynchronizer {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            active.pump.abort();
        }
    }
}

/// How the event pump ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpExit {
    /// Released by `stop`, `restart` or drop
    Cancelled,
    /// An `Error` event was applied
    Failed,
    /// The store closed the stream without reporting a failure
    Closed,
}

/// Run the pump and turn an abnormal exit into an `Error` state
async fn run_pump(
    mut subscription: Subscription,
    view: Arc<RwLock<InventoryView>>,
    revision: Arc<watch::Sender<u64>>,
) {
    let exit = AssertUnwindSafe(pump_events(&mut subscription, &view, &revision))
        .catch_unwind()
        .await;

    let failure = match exit {
        Ok(PumpExit::Cancelled) | Ok(PumpExit::Failed) => None,
        Ok(PumpExit::Closed) => Some(StoreFailure::disconnected(
            "subscription closed without an error",
        )),
        Err(_) => Some(StoreFailure::internal("event pump panicked")),
    };

    if let Some(failure) = failure {
        let mut guard = view.write().await;
        if subscription.is_cancelled() {
            tracing::debug!(path = %subscription.path(), "Pump exit after cancel ignored");
        } else {
            tracing::warn!(path = %subscription.path(), error = %failure, "Event pump ended unexpectedly");
            guard.apply_error(failure);
            drop(guard);
            revision.send_modify(|revision| *revision += 1);
        }
    }

    tracing::debug!(path = %subscription.path(), "Event pump finished");
}

/// Apply subscription events to the view until cancelled, failed or closed
async fn pump_events(
    subscription: &mut Subscription,
    view: &RwLock<InventoryView>,
    revision: &watch::Sender<u64>,
) -> PumpExit {
    while let Some(event) = subscription.recv().await {
        let mut guard = view.write().await;
        if subscription.is_cancelled() {
            tracing::debug!(path = %subscription.path(), "Discarding event after cancel");
            return PumpExit::Cancelled;
        }

        let failed = matches!(event, StoreEvent::Error(_));
        guard.apply(event);
        drop(guard);
        revision.send_modify(|revision| *revision += 1);

        if failed {
            return PumpExit::Failed;
        }
    }

    if subscription.is_cancelled() {
        PumpExit::Cancelled
    } else {
        PumpExit::Closed
    }
}
