//! Collection subscriptions
//!
//! A `Subscription` is the consumer half of a live collection listener; the
//! backend keeps the matching `SubscriptionSink`. Cancelling (or dropping) the
//! subscription tells the backend to release its connection, and any event
//! still in flight afterwards is discarded.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::{mpsc, watch};

use super::error::StoreFailure;

/// Event delivered by a collection subscription
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// Full contents of the collection, replacing any earlier snapshot
    Snapshot(Map<String, Value>),
    /// The subscription failed; no further events follow
    Error(StoreFailure),
}

/// Create a connected sink/subscription pair for `path`
pub fn channel(path: impl Into<String>, buffer: usize) -> (SubscriptionSink, Subscription) {
    let (events_tx, events_rx) = mpsc::channel(buffer.max(1));
    let (cancel_tx, cancel_rx) = watch::channel(false);

    let sink = SubscriptionSink {
        events: events_tx,
        cancelled: cancel_rx,
    };
    let subscription = Subscription {
        path: path.into(),
        events: events_rx,
        cancel: Arc::new(cancel_tx),
    };

    (sink, subscription)
}

/// Consumer half of a live subscription
#[derive(Debug)]
pub struct Subscription {
    path: String,
    events: mpsc::Receiver<StoreEvent>,
    cancel: Arc<watch::Sender<bool>>,
}

impl Subscription {
    /// Path of the subscribed collection
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Next event, or `None` once cancelled or closed by the backend
    pub async fn recv(&mut self) -> Option<StoreEvent> {
        if self.is_cancelled() {
            return None;
        }
        let event = self.events.recv().await?;
        if self.is_cancelled() {
            return None;
        }
        Some(event)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Handle that can cancel this subscription from elsewhere
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancel: Arc::clone(&self.cancel),
        }
    }

    /// Stop delivery and release the backend connection. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        self.cancel_handle().cancel();
        self.events.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Cancels a subscription it does not own
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancel: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let was_cancelled = self.cancel.send_replace(true);
        if !was_cancelled {
            tracing::debug!("Subscription cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }
}

/// Outcome of a non-blocking delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The consumer's buffer is full
    Lagging,
    /// The consumer cancelled or went away
    Closed,
}

/// Backend half of a live subscription
#[derive(Debug, Clone)]
pub struct SubscriptionSink {
    events: mpsc::Sender<StoreEvent>,
    cancelled: watch::Receiver<bool>,
}

impl SubscriptionSink {
    /// True once the consumer cancelled or went away
    pub fn is_closed(&self) -> bool {
        *self.cancelled.borrow() || self.events.is_closed()
    }

    /// Deliver an event. Returns `false` if the consumer is gone.
    pub async fn send(&self, event: StoreEvent) -> bool {
        if self.is_closed() {
            return false;
        }
        self.events.send(event).await.is_ok()
    }

    /// Deliver an event without waiting for buffer space
    pub fn try_send(&self, event: StoreEvent) -> Delivery {
        if self.is_closed() {
            return Delivery::Closed;
        }
        match self.events.try_send(event) {
            Ok(()) => Delivery::Delivered,
            Err(mpsc::error::TrySendError::Full(_)) => Delivery::Lagging,
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Resolves once the consumer cancels or drops its subscription
    pub async fn closed(&mut self) {
        loop {
            if *self.cancelled.borrow_and_update() {
                return;
            }
            tokio::select! {
                changed = self.cancelled.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = self.events.closed() => return,
            }
        }
    }
}
