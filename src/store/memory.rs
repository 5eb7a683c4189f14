//! In-process store
//!
//! A real-time JSON tree held in memory. Every write that changes data under
//! a subscribed collection pushes a full snapshot of that collection to each
//! live subscription. Delivery never waits on a consumer: a subscription whose
//! buffer is full is dropped, and its consumer sees the stream close. Used for
//! local runs and tests.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use super::error::StoreFailure;
use super::push_id::PushIdGenerator;
use super::subscription::{self, Delivery, StoreEvent, Subscription, SubscriptionSink};
use super::tree;
use super::RemoteStore;

/// Default subscription channel capacity
const DEFAULT_BUFFER: usize = 64;

struct Subscriber {
    path: Vec<String>,
    sink: SubscriptionSink,
}

impl Subscriber {
    fn segments(&self) -> Vec<&str> {
        self.path.iter().map(String::as_str).collect()
    }

    /// Whether a write at `written` can change this subscriber's collection
    fn is_affected_by(&self, written: &[&str]) -> bool {
        self.path
            .iter()
            .zip(written.iter())
            .all(|(subscribed, written)| subscribed == written)
    }
}

#[derive(Default)]
struct MemoryState {
    root: Value,
    subscribers: Vec<Subscriber>,
    fail_next: Option<StoreFailure>,
}

/// Counters of calls that reached the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStoreStats {
    pub reads: u64,
    pub writes: u64,
    pub subscribes: u64,
}

/// In-memory real-time store
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    keys: PushIdGenerator,
    buffer: usize,
    reads: AtomicU64,
    writes: AtomicU64,
    subscribes: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_BUFFER)
    }

    /// Create an empty store whose subscriptions buffer `buffer` events
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            keys: PushIdGenerator::new(),
            buffer,
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            subscribes: AtomicU64::new(0),
        }
    }

    /// Create a store holding `root` as its initial tree
    pub fn with_data(root: Value) -> Self {
        let mut store = Self::new();
        store.state.get_mut().root = root;
        store
    }

    /// Make the next store call fail with `failure`
    pub async fn fail_next(&self, failure: StoreFailure) {
        self.state.lock().await.fail_next = Some(failure);
    }

    /// Fail every live subscription on `path` with `failure` and drop them
    pub async fn break_subscriptions(&self, path: &str, failure: StoreFailure) {
        let target = tree::segments(path);
        let mut state = self.state.lock().await;

        let mut live = Vec::with_capacity(state.subscribers.len());
        for subscriber in state.subscribers.drain(..) {
            if subscriber.segments() == target {
                subscriber.sink.try_send(StoreEvent::Error(failure.clone()));
                tracing::debug!(path = %path, "Subscription broken");
            } else {
                live.push(subscriber);
            }
        }
        state.subscribers = live;
    }

    /// Drop every live subscription on `path` without reporting a failure
    pub async fn close_subscriptions(&self, path: &str) {
        let target = tree::segments(path);
        let mut state = self.state.lock().await;
        state.subscribers.retain(|subscriber| subscriber.segments() != target);
        tracing::debug!(path = %path, "Subscriptions closed");
    }

    /// Number of live subscriptions on `path`
    pub async fn subscriber_count(&self, path: &str) -> usize {
        let target = tree::segments(path);
        let state = self.state.lock().await;
        state
            .subscribers
            .iter()
            .filter(|s| !s.sink.is_closed() && s.segments() == target)
            .count()
    }

    /// Copy of the whole tree
    pub async fn dump(&self) -> Value {
        self.state.lock().await.root.clone()
    }

    pub fn stats(&self) -> MemoryStoreStats {
        MemoryStoreStats {
            reads: self.reads.load(Ordering::SeqCst),
            writes: self.writes.load(Ordering::SeqCst),
            subscribes: self.subscribes.load(Ordering::SeqCst),
        }
    }

    /// Apply a mutation to the tree and fan out snapshots if anything changed
    async fn write<F>(&self, path: &str, key: &str, mutate: F) -> Result<(), StoreFailure>
    where
        F: FnOnce(&mut Value, &[&str]),
    {
        self.writes.fetch_add(1, Ordering::SeqCst);
        tree::validate_key(key)?;

        let mut state = self.state.lock().await;
        if let Some(failure) = state.fail_next.take() {
            return Err(failure);
        }

        let mut target = tree::segments(path);
        target.push(key);

        let before = tree::get(&state.root, &target).cloned();
        mutate(&mut state.root, &target);
        let after = tree::get(&state.root, &target);

        if before.as_ref() != after {
            publish(&mut state, &target);
        }
        Ok(())
    }
}

/// Push the current collection to every subscriber the write at `written` touches
fn publish(state: &mut MemoryState, written: &[&str]) {
    let mut live = Vec::with_capacity(state.subscribers.len());

    for subscriber in state.subscribers.drain(..) {
        if subscriber.sink.is_closed() {
            continue;
        }
        if subscriber.is_affected_by(written) {
            let snapshot = tree::collection(&state.root, &subscriber.segments());
            match subscriber.sink.try_send(StoreEvent::Snapshot(snapshot)) {
                Delivery::Delivered => {}
                Delivery::Lagging => {
                    tracing::warn!(
                        path = %subscriber.path.join("/"),
                        "Subscriber is not keeping up, dropping it"
                    );
                    continue;
                }
                Delivery::Closed => continue,
            }
        }
        live.push(subscriber);
    }

    state.subscribers = live;
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn subscribe_collection(&self, path: &str) -> Result<Subscription, StoreFailure> {
        self.subscribes.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state.lock().await;
        if let Some(failure) = state.fail_next.take() {
            return Err(failure);
        }

        let segments = tree::segments(path);
        let (sink, subscription) = subscription::channel(path, self.buffer);

        let initial = tree::collection(&state.root, &segments);
        sink.try_send(StoreEvent::Snapshot(initial));

        state.subscribers.push(Subscriber {
            path: segments.iter().map(|s| s.to_string()).collect(),
            sink,
        });

        tracing::debug!(path = %path, "Collection subscribed");
        Ok(subscription)
    }

    async fn get_by_key(&self, path: &str, key: &str) -> Result<Option<Value>, StoreFailure> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        tree::validate_key(key)?;

        let mut state = self.state.lock().await;
        if let Some(failure) = state.fail_next.take() {
            return Err(failure);
        }

        let mut target = tree::segments(path);
        target.push(key);
        Ok(tree::get(&state.root, &target).cloned())
    }

    async fn set_by_key(&self, path: &str, key: &str, value: Value) -> Result<(), StoreFailure> {
        self.write(path, key, |root, target| tree::put(root, target, value))
            .await
    }

    async fn update_by_key(
        &self,
        path: &str,
        key: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreFailure> {
        self.write(path, key, |root, target| tree::patch(root, target, fields))
            .await
    }

    async fn delete_by_key(&self, path: &str, key: &str) -> Result<(), StoreFailure> {
        self.write(path, key, |root, target| tree::put(root, target, Value::Null))
            .await
    }

    fn generate_key(&self, _path: &str) -> Result<String, StoreFailure> {
        Ok(self.keys.next_id())
    }
}
