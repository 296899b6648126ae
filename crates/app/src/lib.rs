//! `stocktrail-app` — the transport-agnostic operation boundary.
//!
//! [`InventoryService`] exposes the plain operations the outer layers (HTTP,
//! CLI, whatever) translate to: create product, apply movement, read stock,
//! list movements, dashboard and report queries. It wires the dispatcher, the
//! ledger and the projections together and owns the cross-aggregate concerns
//! the domain cannot see: SKU uniqueness and the optimistic-concurrency retry
//! loop.

pub mod error;
pub mod service;

pub use error::InventoryError;
pub use service::{InventoryService, NewProduct};
