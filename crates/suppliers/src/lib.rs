//! `stocktrail-suppliers` — the supplier directory.
//!
//! Suppliers are opaque parties referenced by products; the core only needs
//! their identity and display name (reporting joins), so the aggregate is
//! intentionally small.

pub mod supplier;

pub use supplier::{
    ContactInfo, CreateSupplier, Supplier, SupplierCommand, SupplierCreated, SupplierEvent,
    SupplierId, SUPPLIER_AGGREGATE_TYPE,
};
