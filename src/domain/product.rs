//! Product entity
//!
//! `Product` is the in-memory entity; `ProductRecord` is the persisted shape
//! stored under `products/<id>`; `ProductChanges` is the merge-patch sent by
//! the edit flow.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::price::derive_discounted_price;

/// A uniquely identified inventory item.
///
/// # Invariants
/// - `discounted_price == round(original_price * 0.90, 2)`
/// - `id` never changes once assigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: String,
    name: String,
    category: String,
    original_price: Decimal,
    discounted_price: Decimal,
    stock: u32,
}

impl Product {
    /// Build a product, deriving its discounted price.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        original_price: Decimal,
        stock: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            original_price,
            discounted_price: derive_discounted_price(original_price),
            stock,
        }
    }

    /// Rebuild a product from a persisted record stored under `key`.
    ///
    /// The key is authoritative for the id. The discounted price is
    /// re-derived rather than trusted from the record.
    pub fn from_record(key: &str, record: ProductRecord) -> Self {
        let product = Self::new(
            key,
            record.name,
            record.category,
            record.original_price,
            record.stock,
        );

        if product.discounted_price != record.discounted_price {
            tracing::warn!(
                key = %key,
                stored = %record.discounted_price,
                derived = %product.discounted_price,
                "Stored discounted price is stale, using derived value"
            );
        }

        product
    }

    /// Persisted shape of this product, with the id embedded in the payload
    pub fn to_record(&self) -> ProductRecord {
        ProductRecord {
            id: Some(self.id.clone()),
            name: self.name.clone(),
            original_price: self.original_price,
            discounted_price: self.discounted_price,
            category: self.category.clone(),
            stock: self.stock,
        }
    }

    /// Same product with a new price and stock, discount re-derived.
    pub fn with_price_stock(&self, original_price: Decimal, stock: u32) -> Self {
        Self::new(
            self.id.clone(),
            self.name.clone(),
            self.category.clone(),
            original_price,
            stock,
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn original_price(&self) -> Decimal {
        self.original_price
    }

    pub fn discounted_price(&self) -> Decimal {
        self.discounted_price
    }

    pub fn stock(&self) -> u32 {
        self.stock
    }

    /// `original_price * stock`, saturating at `Decimal::MAX`
    pub fn inventory_value(&self) -> Decimal {
        self.original_price
            .checked_mul(Decimal::from(self.stock))
            .unwrap_or(Decimal::MAX)
    }

    /// True when stock is strictly below `threshold`
    pub fn is_low_stock(&self, threshold: u32) -> bool {
        self.stock < threshold
    }
}

/// Persisted record shape.
///
/// Field names follow the stored collection:
/// `{ id, nombre, precioOriginal, precioConDescuento, categoria, stock }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "nombre")]
    pub name: String,

    #[serde(rename = "precioOriginal", with = "rust_decimal::serde::float")]
    pub original_price: Decimal,

    #[serde(rename = "precioConDescuento", with = "rust_decimal::serde::float")]
    pub discounted_price: Decimal,

    #[serde(rename = "categoria")]
    pub category: String,

    pub stock: u32,
}

/// Merge-patch written by the edit flow.
///
/// Only these three fields are touched; name and category stay as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductChanges {
    #[serde(rename = "precioOriginal", with = "rust_decimal::serde::float")]
    pub original_price: Decimal,

    #[serde(rename = "precioConDescuento", with = "rust_decimal::serde::float")]
    pub discounted_price: Decimal,

    pub stock: u32,
}

impl ProductChanges {
    /// Changes for a new price and stock, discount derived
    pub fn new(original_price: Decimal, stock: u32) -> Self {
        Self {
            original_price,
            discounted_price: derive_discounted_price(original_price),
            stock,
        }
    }

    /// Field map as sent to a merge-patch update
    pub fn to_fields(&self) -> Result<serde_json::Map<String, serde_json::Value>, serde_json::Error> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(fields) => Ok(fields),
            _ => Ok(serde_json::Map::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_product_new_derives_discount() {
        let product = Product::new("p1", "Widget", "Tools", dec!(20), 4);
        assert_eq!(product.discounted_price(), dec!(18.00));
        assert_eq!(product.inventory_value(), dec!(80));
    }

    #[test]
    fn test_with_price_stock_keeps_identity() {
        let product = Product::new("p1", "Widget", "Tools", dec!(20), 4);
        let updated = product.with_price_stock(dec!(50), 12);

        assert_eq!(updated.id(), "p1");
        assert_eq!(updated.name(), "Widget");
        assert_eq!(updated.category(), "Tools");
        assert_eq!(updated.discounted_price(), dec!(45.00));
        assert_eq!(updated.stock(), 12);
    }

    #[test]
    fn test_inventory_value_saturates() {
        let product = Product::new("p1", "Vault", "Tools", Decimal::MAX, 2);
        assert_eq!(product.inventory_value(), Decimal::MAX);

        let product = Product::new("p2", "Vault", "Tools", dec!(100000000000000000000), u32::MAX);
        assert_eq!(product.inventory_value(), Decimal::MAX);
    }

    #[test]
    fn test_low_stock() {
        let product = Product::new("p1", "Widget", "Tools", dec!(20), 9);
        assert!(product.is_low_stock(10));
        assert!(!product.is_low_stock(9));
    }

    #[test]
    fn test_record_field_names() {
        let product = Product::new("-Nabc", "Widget", "Tools", dec!(20), 4);
        let value = serde_json::to_value(product.to_record()).unwrap();

        assert_eq!(value["id"], json!("-Nabc"));
        assert_eq!(value["nombre"], json!("Widget"));
        assert_eq!(value["categoria"], json!("Tools"));
        assert_eq!(value["precioOriginal"].as_f64(), Some(20.0));
        assert_eq!(value["precioConDescuento"].as_f64(), Some(18.0));
        assert_eq!(value["stock"], json!(4));
    }

    #[test]
    fn test_record_decodes_integer_and_float_prices() {
        let record: ProductRecord = serde_json::from_value(json!({
            "id": "k1",
            "nombre": "Hammer",
            "precioOriginal": 12,
            "precioConDescuento": 10.8,
            "categoria": "Tools",
            "stock": 3
        }))
        .unwrap();

        assert_eq!(record.original_price, dec!(12));
        assert_eq!(record.discounted_price, dec!(10.8));
    }

    #[test]
    fn test_from_record_uses_key_and_rederives_discount() {
        let record: ProductRecord = serde_json::from_value(json!({
            "id": "some-other-id",
            "nombre": "Hammer",
            "precioOriginal": 12,
            "precioConDescuento": 1,
            "categoria": "Tools",
            "stock": 3
        }))
        .unwrap();

        let product = Product::from_record("k1", record);
        assert_eq!(product.id(), "k1");
        assert_eq!(product.discounted_price(), dec!(10.80));
    }

    #[test]
    fn test_record_without_id_decodes() {
        let record: ProductRecord = serde_json::from_value(json!({
            "nombre": "Saw",
            "precioOriginal": 30.5,
            "precioConDescuento": 27.45,
            "categoria": "Tools",
            "stock": 0
        }))
        .unwrap();

        assert!(record.id.is_none());
    }

    #[test]
    fn test_changes_fields() {
        let fields = ProductChanges::new(dec!(10), 7).to_fields().unwrap();

        assert_eq!(fields.len(), 3);
        assert_eq!(fields["precioOriginal"].as_f64(), Some(10.0));
        assert_eq!(fields["precioConDescuento"].as_f64(), Some(9.0));
        assert_eq!(fields["stock"], json!(7));
    }
}
