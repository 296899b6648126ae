//! Supplier directory projection: display names for reporting joins.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use stocktrail_core::AggregateId;
use stocktrail_events::EventEnvelope;
use stocktrail_suppliers::{SupplierEvent, SupplierId, SUPPLIER_AGGREGATE_TYPE};

use crate::projections::ProjectionError;
use crate::read_model::ReadModelStore;

/// Queryable supplier read model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierEntry {
    pub supplier_id: SupplierId,
    pub name: String,
}

/// Supplier directory projection.
#[derive(Debug)]
pub struct SupplierDirectoryProjection<S>
where
    S: ReadModelStore<SupplierId, SupplierEntry>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> SupplierDirectoryProjection<S>
where
    S: ReadModelStore<SupplierId, SupplierEntry>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, supplier_id: &SupplierId) -> Option<SupplierEntry> {
        self.store.get(supplier_id)
    }

    pub fn list(&self) -> Vec<SupplierEntry> {
        self.store.list()
    }

    pub fn count(&self) -> u64 {
        self.store.list().len() as u64
    }

    /// Apply a published envelope into the projection.
    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != SUPPLIER_AGGREGATE_TYPE {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        if let Ok(mut cursors) = self.cursors.write() {
            let last = *cursors.get(&aggregate_id).unwrap_or(&0);

            if seq == 0 {
                return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
            }

            if seq <= last {
                return Ok(());
            }

            if seq != last + 1 && last != 0 {
                return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
            }

            let event: SupplierEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

            match event {
                SupplierEvent::SupplierCreated(e) => {
                    if e.supplier_id.0 != aggregate_id {
                        return Err(ProjectionError::StreamMismatch(
                            "event supplier_id does not match envelope aggregate_id".to_string(),
                        ));
                    }
                    self.store.upsert(
                        e.supplier_id,
                        SupplierEntry {
                            supplier_id: e.supplier_id,
                            name: e.name,
                        },
                    );
                }
            }

            cursors.insert(aggregate_id, seq);
        }

        Ok(())
    }

    /// Rebuild the read model from scratch by replaying envelopes.
    pub fn rebuild(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), ProjectionError> {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.clear();
        }
        self.store.clear();

        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| (*e.aggregate_id().as_uuid().as_bytes(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}
