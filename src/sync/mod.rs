//! Inventory synchronization module
//!
//! Keeps a local, read-only mirror of the remote products collection and
//! derives the views consumers read: filtered product lists and aggregate
//! statistics.

mod synchronizer;
mod view;

pub use synchronizer::InventorySynchronizer;
pub use view::{AggregateStats, InventorySnapshot, InventoryView, StockFilter, SyncState};
