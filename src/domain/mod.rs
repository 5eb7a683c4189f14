//! Domain module
//!
//! Product entity, price derivation and input validation.
//! Nothing in here touches the remote store.

pub mod error;
pub mod input;
pub mod price;
pub mod product;
pub mod validation;

pub use error::ValidationError;
pub use input::{EditDraft, PriceStockInput, ProductInput};
pub use price::{derive_discounted_price, discount_preview, parse_price, DISCOUNT_RATE, MAX_PRICE};
pub use product::{Product, ProductChanges, ProductRecord};
pub use validation::{validate_price_stock, validate_product_input, ValidatedPriceStock, ValidatedProduct};
