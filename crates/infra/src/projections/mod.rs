//! Disposable read models built from the event log.
//!
//! Each projection is idempotent (at-least-once delivery safe) via a
//! per-stream cursor, and rebuildable from scratch by replaying the log.

pub mod catalog;
pub mod stock_levels;
pub mod supplier_directory;

pub use catalog::{CatalogEntry, ProductCatalogProjection};
pub use stock_levels::{StockDrift, StockLevel, StockLevelsProjection};
pub use supplier_directory::{SupplierDirectoryProjection, SupplierEntry};

use thiserror::Error;

/// Projection application error.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("failed to deserialize event payload: {0}")]
    Deserialize(String),

    #[error("envelope/stream mismatch: {0}")]
    StreamMismatch(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}
