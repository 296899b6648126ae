//! Operation-boundary error taxonomy.

use thiserror::Error;

/// Errors surfaced by [`crate::InventoryService`] operations.
///
/// Validation failures are detected before any write; nothing is partially
/// applied. No error here is fatal to the process — each is scoped to the
/// single request that triggered it.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// A product with this canonical SKU already exists.
    #[error("duplicate SKU: {0}")]
    DuplicateSku(String),

    /// Malformed input (empty name/SKU, negative thresholds or quantities).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The referenced product does not exist.
    #[error("unknown product")]
    UnknownProduct,

    /// The movement was rejected (non-positive magnitude).
    #[error("invalid movement: {0}")]
    InvalidMovement(String),

    /// Transient infrastructure failure; the request may be retried.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}
