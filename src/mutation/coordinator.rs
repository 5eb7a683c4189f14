//! Mutation Coordinator
//!
//! Validates and executes create/edit/remove against the remote store. It
//! never touches the synchronizer's state: the effect of a write becomes
//! visible once the store pushes the next snapshot.

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::config::Config;
use crate::domain::{EditDraft, PriceStockInput, Product, ProductInput, ProductRecord, ValidationError};
use crate::error::{AppError, AppResult};
use crate::store::RemoteStore;

/// Executes product writes
pub struct MutationCoordinator {
    store: Arc<dyn RemoteStore>,
    path: String,
}

impl MutationCoordinator {
    pub fn new(store: Arc<dyn RemoteStore>, path: impl Into<String>) -> Self {
        Self {
            store,
            path: path.into(),
        }
    }

    pub fn from_config(store: Arc<dyn RemoteStore>, config: &Config) -> Self {
        Self::new(store, config.products_path.clone())
    }

    /// Validate and persist a new product.
    ///
    /// The generated key is embedded in the record as `id`.
    pub async fn create(&self, input: &ProductInput) -> AppResult<Product> {
        let span = tracing::info_span!("create_product", operation_id = %Uuid::new_v4());
        self.execute_create(input).instrument(span).await
    }

    async fn execute_create(&self, input: &ProductInput) -> AppResult<Product> {
        let validated = input.validate().map_err(|e| {
            tracing::debug!(field = e.field(), error = %e, "Create rejected");
            e
        })?;

        let key = self.store.generate_key(&self.path)?;
        let product = validated.into_product(key);
        let record = serde_json::to_value(product.to_record())?;

        self.store.set_by_key(&self.path, product.id(), record).await?;

        tracing::info!(
            key = %product.id(),
            name = %product.name(),
            original_price = %product.original_price(),
            discounted_price = %product.discounted_price(),
            stock = product.stock(),
            "Product created"
        );
        Ok(product)
    }

    /// Point read of one product.
    ///
    /// An empty key returns `Ok(None)` without a store call; an absent record
    /// is `NotFound`.
    pub async fn fetch_by_key(&self, key: &str) -> AppResult<Option<Product>> {
        let key = key.trim();
        if key.is_empty() {
            return Ok(None);
        }

        let value = self
            .store
            .get_by_key(&self.path, key)
            .await?
            .ok_or_else(|| AppError::NotFound(key.to_string()))?;

        let record: ProductRecord = serde_json::from_value(value)?;
        Ok(Some(Product::from_record(key, record)))
    }

    /// Fetch a product and open an edit draft pre-filled from it
    pub async fn begin_edit(&self, key: &str) -> AppResult<Option<EditDraft>> {
        Ok(self.fetch_by_key(key).await?.map(EditDraft::from_product))
    }

    /// Update the price and stock of an existing product.
    ///
    /// Only `precioOriginal`, `precioConDescuento` and `stock` are written.
    pub async fn edit(&self, key: &str, input: &PriceStockInput) -> AppResult<Product> {
        let span = tracing::info_span!("edit_product", operation_id = %Uuid::new_v4(), key = %key);
        self.execute_edit(key, input).instrument(span).await
    }

    async fn execute_edit(&self, key: &str, input: &PriceStockInput) -> AppResult<Product> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ValidationError::MissingField("id").into());
        }

        let current = self
            .fetch_by_key(key)
            .await?
            .ok_or_else(|| AppError::NotFound(key.to_string()))?;

        let validated = input.validate()?;
        let changes = validated.to_changes();

        self.store
            .update_by_key(&self.path, key, changes.to_fields()?)
            .await?;

        let updated = current.with_price_stock(changes.original_price, changes.stock);
        tracing::info!(
            original_price = %updated.original_price(),
            discounted_price = %updated.discounted_price(),
            stock = updated.stock(),
            "Product updated"
        );
        Ok(updated)
    }

    /// Submit an edit draft
    pub async fn submit_edit(&self, draft: &EditDraft) -> AppResult<Product> {
        self.edit(draft.key(), &draft.input).await
    }

    /// Delete a product. Confirmation is the caller's job.
    ///
    /// Deleting an absent product succeeds.
    pub async fn remove(&self, key: &str) -> AppResult<()> {
        let span = tracing::info_span!("remove_product", operation_id = %Uuid::new_v4(), key = %key);
        self.execute_remove(key).instrument(span).await
    }

    async fn execute_remove(&self, key: &str) -> AppResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ValidationError::MissingField("id").into());
        }

        self.store.delete_by_key(&self.path, key).await?;
        tracing::info!("Product removed");
        Ok(())
    }
}
