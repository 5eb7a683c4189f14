//! Remote store module
//!
//! The `RemoteStore` trait is the seam between the inventory logic and the
//! hosted real-time database. Two implementations ship: `MemoryStore` for
//! development and tests, and `FirebaseStore` for a Realtime Database.

mod error;
mod firebase;
mod memory;
mod push_id;
mod subscription;
pub mod tree;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::{Config, StoreBackend};

pub use error::{FailureReason, StoreFailure};
pub use firebase::FirebaseStore;
pub use memory::{MemoryStore, MemoryStoreStats};
pub use push_id::{PushIdGenerator, PUSH_ID_LEN};
pub use subscription::{channel, CancelHandle, Delivery, StoreEvent, Subscription, SubscriptionSink};

/// Hosted JSON document store with live collection listeners
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Listen to every record under `path`.
    ///
    /// The first event is the current contents; each later event is a full
    /// replacement. An `Error` event ends the subscription.
    async fn subscribe_collection(&self, path: &str) -> Result<Subscription, StoreFailure>;

    /// One record, or `None` if absent
    async fn get_by_key(&self, path: &str, key: &str) -> Result<Option<Value>, StoreFailure>;

    /// Create or overwrite the record at `key`
    async fn set_by_key(&self, path: &str, key: &str, value: Value) -> Result<(), StoreFailure>;

    /// Merge the named fields into the record at `key`
    async fn update_by_key(
        &self,
        path: &str,
        key: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreFailure>;

    /// Remove the record at `key`. Removing an absent record succeeds.
    async fn delete_by_key(&self, path: &str, key: &str) -> Result<(), StoreFailure>;

    /// Fresh unique key for a new record under `path`
    fn generate_key(&self, path: &str) -> Result<String, StoreFailure>;

    /// Release connections held by the store
    async fn shutdown(&self) {}
}

/// Build the store selected by `config`
pub fn connect(config: &Config) -> Result<Arc<dyn RemoteStore>, StoreFailure> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::with_buffer(config.subscription_buffer)))
        }
        StoreBackend::Firebase => {
            let url = config
                .firebase_database_url
                .clone()
                .ok_or_else(|| StoreFailure::invalid_path("database URL is not configured"))?;
            tracing::info!(url = %url, "Using realtime database store");
            let store = FirebaseStore::new(
                url,
                config.firebase_auth_token.clone(),
                config.request_timeout,
                config.subscription_buffer,
            )?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_memory() {
        let config = Config::default();
        assert!(connect(&config).is_ok());
    }

    #[test]
    fn test_connect_firebase_without_url() {
        let config = Config {
            backend: StoreBackend::Firebase,
            ..Config::default()
        };
        let err = connect(&config).err().unwrap();
        assert_eq!(err.reason, FailureReason::InvalidPath);
    }
}
