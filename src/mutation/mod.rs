//! Mutation module
//!
//! Product writes: create, edit and remove, plus the point read used by the
//! edit flow. Writes go straight to the remote store; the synchronizer picks
//! up their effect from its own subscription.

mod coordinator;
mod tests;

pub use coordinator::MutationCoordinator;
pub use crate::domain::{EditDraft, PriceStockInput, ProductInput};
