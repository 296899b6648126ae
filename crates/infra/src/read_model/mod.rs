//! Read model storage abstractions (disposable, rebuildable views).

pub mod store;

pub use store::{InMemoryReadModelStore, ReadModelStore};
