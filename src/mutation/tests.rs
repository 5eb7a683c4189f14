//! Coordinator tests against the in-memory store

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal_macros::dec;
    use serde_json::json;

    use crate::domain::ValidationError;
    use crate::error::AppError;
    use crate::mutation::{MutationCoordinator, PriceStockInput, ProductInput};
    use crate::store::{FailureReason, MemoryStore, RemoteStore, StoreFailure, PUSH_ID_LEN};

    fn setup() -> (Arc<MemoryStore>, MutationCoordinator) {
        let store = Arc::new(MemoryStore::new());
        let coordinator = MutationCoordinator::new(store.clone(), "products");
        (store, coordinator)
    }

    fn widget() -> ProductInput {
        ProductInput::new("Widget", "Tools", "20", "4")
    }

    // =========================================================================
    // create
    // =========================================================================

    #[tokio::test]
    async fn test_create_writes_full_record_with_embedded_id() {
        let (store, coordinator) = setup();

        let product = coordinator.create(&widget()).await.unwrap();

        assert_eq!(product.id().len(), PUSH_ID_LEN);
        assert_eq!(product.discounted_price(), dec!(18.00));

        let stored = store.get_by_key("products", product.id()).await.unwrap().unwrap();
        assert_eq!(
            stored,
            json!({
                "id": product.id(),
                "nombre": "Widget",
                "categoria": "Tools",
                "precioOriginal": 20.0,
                "precioConDescuento": 18.0,
                "stock": 4,
            })
        );
    }

    #[tokio::test]
    async fn test_create_validation_failure_never_reaches_store() {
        let (store, coordinator) = setup();

        let err = coordinator
            .create(&ProductInput::new("", "Tools", "20", "4"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::MissingField("name"))));

        let err = coordinator
            .create(&ProductInput::new("Widget", "Tools", "abc", "4"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::InvalidPrice(_))));

        let err = coordinator
            .create(&ProductInput::new("Widget", "Tools", "20", "-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::InvalidStock(_))));

        assert_eq!(store.stats().writes, 0);
    }

    #[tokio::test]
    async fn test_create_reports_store_failure() {
        let (store, coordinator) = setup();
        store.fail_next(StoreFailure::permission_denied("Permission denied")).await;

        let err = coordinator.create(&widget()).await.unwrap_err();

        assert!(matches!(&err, AppError::Store(f) if f.reason == FailureReason::PermissionDenied));
        assert!(store.dump().await.is_null());
    }

    #[tokio::test]
    async fn test_created_keys_are_distinct() {
        let (_, coordinator) = setup();
        let a = coordinator.create(&widget()).await.unwrap();
        let b = coordinator.create(&widget()).await.unwrap();
        assert_ne!(a.id(), b.id());
    }

    // =========================================================================
    // fetch_by_key
    // =========================================================================

    #[tokio::test]
    async fn test_fetch_empty_key_skips_store() {
        let (store, coordinator) = setup();

        assert_eq!(coordinator.fetch_by_key("").await.unwrap(), None);
        assert_eq!(coordinator.fetch_by_key("   ").await.unwrap(), None);
        assert_eq!(store.stats().reads, 0);
    }

    #[tokio::test]
    async fn test_fetch_missing_is_not_found() {
        let (_, coordinator) = setup();
        let err = coordinator.fetch_by_key("nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(key) if key == "nope"));
    }

    #[tokio::test]
    async fn test_fetch_round_trips_created_product() {
        let (_, coordinator) = setup();
        let created = coordinator.create(&widget()).await.unwrap();

        let fetched = coordinator.fetch_by_key(created.id()).await.unwrap();
        assert_eq!(fetched, Some(created));
    }

    #[tokio::test]
    async fn test_fetch_malformed_record_is_serialization_failure() {
        let store = Arc::new(MemoryStore::with_data(json!({"products": {"bad": {"nombre": 3}}})));
        let coordinator = MutationCoordinator::new(store, "products");

        let err = coordinator.fetch_by_key("bad").await.unwrap_err();
        assert!(matches!(&err, AppError::Store(f) if f.reason == FailureReason::Serialization));
    }

    // =========================================================================
    // edit
    // =========================================================================

    #[tokio::test]
    async fn test_edit_patches_price_and_stock_only() {
        let (store, coordinator) = setup();
        let created = coordinator.create(&widget()).await.unwrap();

        let updated = coordinator
            .edit(created.id(), &PriceStockInput::new("30", "7"))
            .await
            .unwrap();

        assert_eq!(updated.name(), "Widget");
        assert_eq!(updated.discounted_price(), dec!(27.00));
        assert_eq!(updated.stock(), 7);

        let stored = store.get_by_key("products", created.id()).await.unwrap().unwrap();
        assert_eq!(stored["nombre"], json!("Widget"));
        assert_eq!(stored["id"], json!(created.id()));
        assert_eq!(stored["precioOriginal"], json!(30.0));
        assert_eq!(stored["precioConDescuento"], json!(27.0));
        assert_eq!(stored["stock"], json!(7));
    }

    #[tokio::test]
    async fn test_edit_invalid_price_issues_no_write() {
        let (store, coordinator) = setup();
        let created = coordinator.create(&widget()).await.unwrap();
        let writes = store.stats().writes;

        let err = coordinator
            .edit(created.id(), &PriceStockInput::new("0", "3"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(ValidationError::InvalidPrice(_))));
        assert_eq!(store.stats().writes, writes);
    }

    #[tokio::test]
    async fn test_edit_missing_product_is_not_found() {
        let (store, coordinator) = setup();

        let err = coordinator
            .edit("ghost", &PriceStockInput::new("10", "1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(store.stats().writes, 0);
    }

    #[tokio::test]
    async fn test_edit_empty_key() {
        let (store, coordinator) = setup();
        let err = coordinator
            .edit("", &PriceStockInput::new("10", "1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(ValidationError::MissingField("id"))));
        assert_eq!(store.stats().reads, 0);
    }

    #[tokio::test]
    async fn test_edit_draft_flow() {
        let (_, coordinator) = setup();
        let created = coordinator.create(&widget()).await.unwrap();

        let mut draft = coordinator.begin_edit(created.id()).await.unwrap().unwrap();
        assert_eq!(draft.input.stock, "4");
        assert_eq!(draft.discount_preview(), dec!(18.00));

        assert_eq!(draft.set_original_price("50"), dec!(45.00));
        draft.set_stock("2");

        let updated = coordinator.submit_edit(&draft).await.unwrap();
        assert_eq!(updated.original_price(), dec!(50));
        assert_eq!(updated.stock(), 2);
    }

    // =========================================================================
    // remove
    // =========================================================================

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (store, coordinator) = setup();
        let created = coordinator.create(&widget()).await.unwrap();

        coordinator.remove(created.id()).await.unwrap();
        coordinator.remove(created.id()).await.unwrap();

        assert_eq!(store.get_by_key("products", created.id()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_empty_key() {
        let (store, coordinator) = setup();
        let err = coordinator.remove("").await.unwrap_err();

        assert!(matches!(err, AppError::Validation(ValidationError::MissingField("id"))));
        assert_eq!(store.stats().writes, 0);
    }

    #[tokio::test]
    async fn test_remove_reports_store_failure() {
        let (store, coordinator) = setup();
        store.fail_next(StoreFailure::network("offline")).await;

        let err = coordinator.remove("abc").await.unwrap_err();
        assert!(err.store_failure().map(StoreFailure::is_retryable).unwrap_or(false));
    }
}
