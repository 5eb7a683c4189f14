//! Inventory view
//!
//! Local mirror of the remote collection. Reconciliation is pure: every
//! snapshot event replaces the whole mirror and recomputes the aggregate
//! statistics, every error event keeps the last good data and records the
//! failure.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::domain::{Product, ProductRecord};
use crate::store::{StoreEvent, StoreFailure};

/// Lifecycle of the collection subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No subscription yet
    Uninitialized,
    /// Subscribed, waiting for the first snapshot
    Loading,
    /// At least one snapshot applied and no failure since
    Ready,
    /// The subscription failed; data shown is the last good snapshot
    Error,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Uninitialized => "uninitialized",
            SyncState::Loading => "loading",
            SyncState::Ready => "ready",
            SyncState::Error => "error",
        }
    }
}

/// Products of the last snapshot, keyed (and ordered) by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventorySnapshot {
    products: BTreeMap<String, Product>,
}

impl InventorySnapshot {
    /// Decode a raw collection, skipping records that do not decode.
    ///
    /// Returns the snapshot and the number of skipped records.
    pub fn from_collection(collection: &Map<String, Value>) -> (Self, usize) {
        let mut products = BTreeMap::new();
        let mut skipped = 0;

        for (key, value) in collection {
            match serde_json::from_value::<ProductRecord>(value.clone()) {
                Ok(record) => {
                    products.insert(key.clone(), Product::from_record(key, record));
                }
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(key = %key, error = %e, "Skipping malformed product record");
                }
            }
        }

        (Self { products }, skipped)
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.products.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Products in key order
    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }
}

impl FromIterator<Product> for InventorySnapshot {
    fn from_iter<I: IntoIterator<Item = Product>>(iter: I) -> Self {
        Self {
            products: iter
                .into_iter()
                .map(|p| (p.id().to_string(), p))
                .collect(),
        }
    }
}

/// Figures derived from a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    /// Σ original_price × stock
    pub total_inventory_value: Decimal,
    pub product_count: usize,
    pub low_stock_count: usize,
}

impl AggregateStats {
    /// Totals saturate at `Decimal::MAX` instead of overflowing
    pub fn compute(snapshot: &InventorySnapshot, low_stock_threshold: u32) -> Self {
        snapshot.iter().fold(Self::default(), |mut stats, product| {
            stats.total_inventory_value = stats
                .total_inventory_value
                .checked_add(product.inventory_value())
                .unwrap_or(Decimal::MAX);
            stats.product_count += 1;
            if product.is_low_stock(low_stock_threshold) {
                stats.low_stock_count += 1;
            }
            stats
        })
    }

    /// Total value with exactly two decimals
    pub fn formatted_total(&self) -> String {
        format!("{:.2}", self.total_inventory_value)
    }
}

/// Which products a list shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockFilter {
    #[default]
    All,
    /// Only products whose stock is strictly below the threshold
    LowStock(u32),
}

impl StockFilter {
    /// Flip between showing everything and showing low stock only
    pub fn toggle(self, threshold: u32) -> Self {
        match self {
            StockFilter::All => StockFilter::LowStock(threshold),
            StockFilter::LowStock(_) => StockFilter::All,
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        match self {
            StockFilter::All => true,
            StockFilter::LowStock(threshold) => product.is_low_stock(*threshold),
        }
    }
}

/// Everything a consumer reads from the synchronizer
#[derive(Debug, Clone)]
pub struct InventoryView {
    state: SyncState,
    snapshot: InventorySnapshot,
    stats: AggregateStats,
    last_error: Option<StoreFailure>,
    skipped_records: usize,
    low_stock_threshold: u32,
}

impl InventoryView {
    pub fn new(low_stock_threshold: u32) -> Self {
        Self {
            state: SyncState::Uninitialized,
            snapshot: InventorySnapshot::default(),
            stats: AggregateStats::default(),
            last_error: None,
            skipped_records: 0,
            low_stock_threshold,
        }
    }

    /// A subscription is being opened
    pub fn begin_loading(&mut self) {
        self.state = SyncState::Loading;
    }

    /// The subscription was released on purpose
    pub fn reset_state(&mut self) {
        self.state = SyncState::Uninitialized;
    }

    pub fn apply(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::Snapshot(collection) => self.apply_snapshot(&collection),
            StoreEvent::Error(failure) => self.apply_error(failure),
        }
    }

    /// Replace the mirror with `collection`
    pub fn apply_snapshot(&mut self, collection: &Map<String, Value>) {
        let (snapshot, skipped) = InventorySnapshot::from_collection(collection);

        self.stats = AggregateStats::compute(&snapshot, self.low_stock_threshold);
        self.snapshot = snapshot;
        self.skipped_records = skipped;
        self.last_error = None;

        if self.state != SyncState::Ready {
            tracing::info!(
                from = self.state.as_str(),
                products = self.stats.product_count,
                "Inventory ready"
            );
        }
        self.state = SyncState::Ready;
    }

    /// Record a subscription failure, keeping the last good snapshot
    pub fn apply_error(&mut self, failure: StoreFailure) {
        tracing::error!(
            error = %failure,
            retained = self.snapshot.len(),
            "Inventory subscription failed"
        );
        self.state = SyncState::Error;
        self.last_error = Some(failure);
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn snapshot(&self) -> &InventorySnapshot {
        &self.snapshot
    }

    pub fn stats(&self) -> AggregateStats {
        self.stats
    }

    pub fn last_error(&self) -> Option<&StoreFailure> {
        self.last_error.as_ref()
    }

    /// Records dropped from the last snapshot because they did not decode
    pub fn skipped_records(&self) -> usize {
        self.skipped_records
    }

    pub fn low_stock_threshold(&self) -> u32 {
        self.low_stock_threshold
    }

    /// Products matching `predicate`, in key order
    pub fn filtered_view<P>(&self, predicate: P) -> Vec<Product>
    where
        P: Fn(&Product) -> bool,
    {
        self.snapshot
            .iter()
            .filter(|product| predicate(*product))
            .cloned()
            .collect()
    }

    pub fn filtered(&self, filter: StockFilter) -> Vec<Product> {
        self.filtered_view(|product| filter.matches(product))
    }
}
