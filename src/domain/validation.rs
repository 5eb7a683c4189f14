//! Input validation
//!
//! Turns raw form fields into validated values. Validation is local and
//! aborts the operation before any store call is made.

use rust_decimal::Decimal;

use super::error::ValidationError;
use super::price::{derive_discounted_price, parse_price};
use super::product::{Product, ProductChanges};

/// Fields of a product that passed validation, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedProduct {
    pub name: String,
    pub category: String,
    pub original_price: Decimal,
    pub discounted_price: Decimal,
    pub stock: u32,
}

impl ValidatedProduct {
    /// Attach the store-assigned key
    pub fn into_product(self, id: impl Into<String>) -> Product {
        Product::new(id, self.name, self.category, self.original_price, self.stock)
    }
}

/// Price and stock that passed validation (edit flow).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPriceStock {
    pub original_price: Decimal,
    pub discounted_price: Decimal,
    pub stock: u32,
}

impl ValidatedPriceStock {
    pub fn to_changes(&self) -> ProductChanges {
        ProductChanges::new(self.original_price, self.stock)
    }
}

/// Validate every field of a new product.
///
/// # Errors
/// - `MissingField` if name, category, price or stock is empty (checked in that order)
/// - `InvalidPrice` if the price is not a positive decimal up to `MAX_PRICE`
/// - `InvalidStock` if the stock is not a non-negative integer
pub fn validate_product_input(
    name: &str,
    category: &str,
    original_price_raw: &str,
    stock_raw: &str,
) -> Result<ValidatedProduct, ValidationError> {
    require("name", name)?;
    require("category", category)?;
    require("original_price", original_price_raw)?;
    require("stock", stock_raw)?;

    let price_stock = parse_price_stock(original_price_raw, stock_raw)?;

    Ok(ValidatedProduct {
        name: name.trim().to_string(),
        category: category.trim().to_string(),
        original_price: price_stock.original_price,
        discounted_price: price_stock.discounted_price,
        stock: price_stock.stock,
    })
}

/// Validate the price and stock fields of the edit flow.
pub fn validate_price_stock(
    original_price_raw: &str,
    stock_raw: &str,
) -> Result<ValidatedPriceStock, ValidationError> {
    require("original_price", original_price_raw)?;
    require("stock", stock_raw)?;

    parse_price_stock(original_price_raw, stock_raw)
}

fn parse_price_stock(
    original_price_raw: &str,
    stock_raw: &str,
) -> Result<ValidatedPriceStock, ValidationError> {
    let original_price = parse_price(original_price_raw)
        .ok_or_else(|| ValidationError::InvalidPrice(original_price_raw.to_string()))?;
    let stock = parse_stock(stock_raw)
        .ok_or_else(|| ValidationError::InvalidStock(stock_raw.to_string()))?;

    Ok(ValidatedPriceStock {
        original_price,
        discounted_price: derive_discounted_price(original_price),
        stock,
    })
}

fn parse_stock(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok()
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}
