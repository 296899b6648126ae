//! Stock levels projection: current quantity per product.
//!
//! The projected quantity is a cached fold of the product's movement stream.
//! The event log stays the source of truth: the cache is updated on every
//! committed envelope, and [`StockLevelsProjection::rebuild`] /
//! [`StockLevelsProjection::reconcile`] recompute it wholesale from the log.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use stocktrail_core::AggregateId;
use stocktrail_events::EventEnvelope;
use stocktrail_inventory::{InventoryEvent, ProductId, PRODUCT_AGGREGATE_TYPE};

use crate::projections::ProjectionError;
use crate::read_model::ReadModelStore;

/// Queryable stock read model: current quantity per product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Drift found while reconciling the cached quantities against the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDrift {
    pub product_id: ProductId,
    pub stored: i64,
    pub recomputed: i64,
}

/// Stock levels projection.
///
/// Consumes published envelopes (JSON payloads) and maintains the per-product
/// quantity read model. Idempotent for at-least-once delivery (replays at or
/// below the cursor are ignored).
#[derive(Debug)]
pub struct StockLevelsProjection<S>
where
    S: ReadModelStore<ProductId, StockLevel>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> StockLevelsProjection<S>
where
    S: ReadModelStore<ProductId, StockLevel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    /// Current quantity for a product; 0 when no row exists yet.
    pub fn current(&self, product_id: &ProductId) -> i64 {
        self.store.get(product_id).map(|l| l.quantity).unwrap_or(0)
    }

    /// Query the read model row for one product.
    pub fn get(&self, product_id: &ProductId) -> Option<StockLevel> {
        self.store.get(product_id)
    }

    /// List all stock rows.
    pub fn list(&self) -> Vec<StockLevel> {
        self.store.list()
    }

    /// Apply a published envelope into the projection.
    ///
    /// - Enforces envelope/payload stream agreement
    /// - Enforces monotonic sequence per aggregate stream
    /// - Idempotent for at-least-once delivery (replays <= cursor are ignored)
    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != PRODUCT_AGGREGATE_TYPE {
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
                // Duplicate or replay; safe to ignore.
                return Ok(());
            }

            if seq != last + 1 && last != 0 {
                // First event may carry any positive sequence (stores may start
                // above 1); after that, strictly monotonic increments.
                return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
            }

            let event: InventoryEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

            if event.product_id().0 != aggregate_id {
                return Err(ProjectionError::StreamMismatch(
                    "event product_id does not match envelope aggregate_id".to_string(),
                ));
            }

            match event {
                InventoryEvent::ProductCreated(e) => {
                    self.store.upsert(
                        e.product_id,
                        StockLevel {
                            product_id: e.product_id,
                            quantity: 0,
                        },
                    );
                }
                InventoryEvent::StockMovementRecorded(e) => {
                    let mut level = self.store.get(&e.product_id).unwrap_or(StockLevel {
                        product_id: e.product_id,
                        quantity: 0,
                    });
                    level.quantity += e.signed_delta();
                    self.store.upsert(e.product_id, level);
                }
            }

            // Advance cursor after successful apply.
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

        // Deterministic replay order: aggregate, then sequence.
        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| (*e.aggregate_id().as_uuid().as_bytes(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }

    /// Recompute every quantity from the log and report/correct drift.
    ///
    /// With stock defined as a fold of the ledger this should always return an
    /// empty list; a non-empty result means the cached read model diverged
    /// (e.g. a missed envelope) and has now been corrected.
    pub fn reconcile(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<Vec<StockDrift>, ProjectionError> {
        let before: HashMap<ProductId, i64> = self
            .store
            .list()
            .into_iter()
            .map(|l| (l.product_id, l.quantity))
            .collect();

        self.rebuild(envelopes)?;

        let after = self.store.list();
        let mut drift = Vec::new();

        for level in &after {
            let stored = before.get(&level.product_id).copied().unwrap_or(0);
            if stored != level.quantity {
                drift.push(StockDrift {
                    product_id: level.product_id,
                    stored,
                    recomputed: level.quantity,
                });
            }
        }

        // Rows that existed before but have no events behind them.
        for (product_id, stored) in before {
            if !after.iter().any(|l| l.product_id == product_id) {
                drift.push(StockDrift {
                    product_id,
                    stored,
                    recomputed: 0,
                });
            }
        }

        Ok(drift)
    }
}
