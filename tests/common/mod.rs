//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use inventory_sync::{InventorySynchronizer, InventoryView, MemoryStore, MutationCoordinator};

pub const PRODUCTS: &str = "products";

/// One persisted product record
pub fn record(name: &str, price: f64, stock: u32) -> Value {
    json!({
        "id": name.to_lowercase(),
        "nombre": name,
        "categoria": "General",
        "precioOriginal": price,
        "precioConDescuento": price * 0.9,
        "stock": stock,
    })
}

/// Store seeded with `(key, price, stock)` products
pub fn seeded_store(products: &[(&str, f64, u32)]) -> Arc<MemoryStore> {
    let collection: serde_json::Map<String, Value> = products
        .iter()
        .map(|(key, price, stock)| (key.to_string(), record(key, *price, *stock)))
        .collect();

    let mut root = serde_json::Map::new();
    root.insert(PRODUCTS.to_string(), Value::Object(collection));
    Arc::new(MemoryStore::with_data(Value::Object(root)))
}

pub fn coordinator(store: &Arc<MemoryStore>) -> MutationCoordinator {
    MutationCoordinator::new(store.clone(), PRODUCTS)
}

/// Synchronizer already subscribed and past its first snapshot
pub async fn ready_synchronizer(store: &Arc<MemoryStore>) -> InventorySynchronizer {
    let mut synchronizer = InventorySynchronizer::new(store.clone(), PRODUCTS, 10);
    synchronizer.start().await.expect("subscribe failed");
    wait_until(&synchronizer, |view| {
        view.state() == inventory_sync::SyncState::Ready
    })
    .await;
    synchronizer
}

/// Wait (bounded) for the synchronizer's view to satisfy `predicate`
pub async fn wait_until<P>(synchronizer: &InventorySynchronizer, predicate: P) -> InventoryView
where
    P: FnMut(&InventoryView) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), synchronizer.wait_for(predicate))
        .await
        .expect("timed out waiting for inventory view")
}
