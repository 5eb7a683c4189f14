//! inventory_sync Library
//!
//! Re-exports modules for integration testing and external use.

pub mod config;
pub mod domain;
pub mod mutation;
pub mod store;
pub mod sync;

mod error;

pub use config::{Config, ConfigError, StoreBackend};
pub use domain::{Product, ProductInput, PriceStockInput, EditDraft, ValidationError};
pub use error::{AppError, AppResult};
pub use mutation::MutationCoordinator;
pub use store::{connect, FailureReason, MemoryStore, RemoteStore, StoreEvent, StoreFailure};
pub use sync::{AggregateStats, InventorySynchronizer, InventoryView, StockFilter, SyncState};
