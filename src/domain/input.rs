//! Raw input drafts
//!
//! Field values exactly as typed, before validation. The discount preview is
//! recomputed from the current raw price on every change.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::price::discount_preview;
use super::product::Product;
use super::validation::{validate_price_stock, validate_product_input, ValidatedPriceStock, ValidatedProduct};

/// Fields for creating a product
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub category: String,
    pub original_price: String,
    pub stock: String,
}

impl ProductInput {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        original_price: impl Into<String>,
        stock: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            original_price: original_price.into(),
            stock: stock.into(),
        }
    }

    /// Update the raw price and return the recomputed preview
    pub fn set_original_price(&mut self, raw: impl Into<String>) -> Decimal {
        self.original_price = raw.into();
        self.discount_preview()
    }

    pub fn discount_preview(&self) -> Decimal {
        discount_preview(&self.original_price)
    }

    pub fn validate(&self) -> Result<ValidatedProduct, ValidationError> {
        validate_product_input(&self.name, &self.category, &self.original_price, &self.stock)
    }

    /// Clear every field, as done after a successful create
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Price and stock fields for the edit flow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceStockInput {
    pub original_price: String,
    pub stock: String,
}

impl PriceStockInput {
    pub fn new(original_price: impl Into<String>, stock: impl Into<String>) -> Self {
        Self {
            original_price: original_price.into(),
            stock: stock.into(),
        }
    }

    pub fn discount_preview(&self) -> Decimal {
        discount_preview(&self.original_price)
    }

    pub fn validate(&self) -> Result<ValidatedPriceStock, ValidationError> {
        validate_price_stock(&self.original_price, &self.stock)
    }
}

/// A fetched product being edited.
///
/// The price and stock inputs start out pre-filled from the product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    product: Product,
    pub input: PriceStockInput,
}

impl EditDraft {
    pub fn from_product(product: Product) -> Self {
        let input = PriceStockInput::new(
            product.original_price().to_string(),
            product.stock().to_string(),
        );
        Self { product, input }
    }

    /// The product as it was when fetched
    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn key(&self) -> &str {
        self.product.id()
    }

    /// Update the raw price and return the recomputed preview
    pub fn set_original_price(&mut self, raw: impl Into<String>) -> Decimal {
        self.input.original_price = raw.into();
        self.input.discount_preview()
    }

    pub fn set_stock(&mut self, raw: impl Into<String>) {
        self.input.stock = raw.into();
    }

    pub fn discount_preview(&self) -> Decimal {
        self.input.discount_preview()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_preview_follows_each_keystroke() {
        let mut input = ProductInput::default();

        assert_eq!(input.set_original_price("2"), dec!(1.80));
        assert_eq!(input.set_original_price("20"), dec!(18.00));
        assert_eq!(input.set_original_price("20.x"), dec!(0.00));
        assert_eq!(input.set_original_price(""), dec!(0.00));
    }

    #[test]
    fn test_reset_clears_fields() {
        let mut input = ProductInput::new("Widget", "Tools", "20", "4");
        input.reset();
        assert_eq!(input, ProductInput::default());
    }

    #[test]
    fn test_edit_draft_prefill() {
        let product = Product::new("k1", "Widget", "Tools", dec!(20), 4);
        let draft = EditDraft::from_product(product);

        assert_eq!(draft.key(), "k1");
        assert_eq!(draft.input.original_price, "20");
        assert_eq!(draft.input.stock, "4");
        assert_eq!(draft.discount_preview(), dec!(18.00));
    }

    #[test]
    fn test_edit_draft_preview_updates() {
        let product = Product::new("k1", "Widget", "Tools", dec!(20), 4);
        let mut draft = EditDraft::from_product(product);

        assert_eq!(draft.set_original_price("30"), dec!(27.00));
        draft.set_stock("9");
        assert_eq!(draft.input, PriceStockInput::new("30", "9"));
        // The fetched product itself is untouched
        assert_eq!(draft.product().original_price(), dec!(20));
    }
}
