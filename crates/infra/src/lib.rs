//! Infrastructure layer: event store, command pipeline, ledger queries,
//! read-model storage and projections.

pub mod command_dispatcher;
pub mod event_store;
pub mod ledger;
pub mod projections;
pub mod read_model;
