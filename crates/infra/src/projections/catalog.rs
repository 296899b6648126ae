//! Product catalog projection: slow-changing product attributes.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use stocktrail_core::AggregateId;
use stocktrail_events::EventEnvelope;
use stocktrail_inventory::{InventoryEvent, ProductId, PRODUCT_AGGREGATE_TYPE};
use stocktrail_suppliers::SupplierId;

use crate::projections::ProjectionError;
use crate::read_model::ReadModelStore;

/// Queryable product read model (catalog attributes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: u64,
    pub category: String,
    pub min_stock: i64,
    pub supplier_id: Option<SupplierId>,
}

/// Product catalog projection.
///
/// Movement events flow through the same streams and advance the cursor, but
/// only creation events change catalog attributes.
#[derive(Debug)]
pub struct ProductCatalogProjection<S>
where
    S: ReadModelStore<ProductId, CatalogEntry>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> ProductCatalogProjection<S>
where
    S: ReadModelStore<ProductId, CatalogEntry>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, product_id: &ProductId) -> Option<CatalogEntry> {
        self.store.get(product_id)
    }

    pub fn list(&self) -> Vec<CatalogEntry> {
        self.store.list()
    }

    /// Look up a product by canonical SKU.
    pub fn find_by_sku(&self, sku: &str) -> Option<CatalogEntry> {
        self.store.list().into_iter().find(|e| e.sku == sku)
    }

    /// Apply a published envelope into the projection.
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
                return Ok(());
            }

            if seq != last + 1 && last != 0 {
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
                        CatalogEntry {
                            product_id: e.product_id,
                            sku: e.sku,
                            name: e.name,
                            description: e.description,
                            price_cents: e.price_cents,
                            category: e.category,
                            min_stock: e.min_stock,
                            supplier_id: e.supplier_id,
                        },
                    );
                }
                // Stock movements do not touch catalog attributes.
                InventoryEvent::StockMovementRecorded(_) => {}
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use stocktrail_inventory::{MovementDirection, ProductCreated, StockMovementRecorded};

    use crate::read_model::InMemoryReadModelStore;

    fn projection() -> ProductCatalogProjection<Arc<InMemoryReadModelStore<ProductId, CatalogEntry>>> {
        ProductCatalogProjection::new(Arc::new(InMemoryReadModelStore::new()))
    }

    fn make_envelope(product_id: ProductId, seq: u64, event: InventoryEvent) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            uuid::Uuid::now_v7(),
            product_id.0,
            PRODUCT_AGGREGATE_TYPE,
            seq,
            serde_json::to_value(&event).unwrap(),
        )
    }

    #[test]
    fn creation_populates_catalog_and_movements_leave_it_unchanged() {
        let proj = projection();
        let product_id = ProductId::new(AggregateId::new());

        proj.apply_envelope(&make_envelope(
            product_id,
            1,
            InventoryEvent::ProductCreated(ProductCreated {
                product_id,
                sku: "MOUSE001".to_string(),
                name: "Wireless Mouse".to_string(),
                description: Some("2.4GHz".to_string()),
                price_cents: 2599,
                category: "Peripherals".to_string(),
                min_stock: 20,
                supplier_id: None,
                occurred_at: Utc::now(),
            }),
        ))
        .unwrap();

        proj.apply_envelope(&make_envelope(
            product_id,
            2,
            InventoryEvent::StockMovementRecorded(StockMovementRecorded {
                product_id,
                direction: MovementDirection::In,
                quantity: 45,
                note: None,
                occurred_at: Utc::now(),
            }),
        ))
        .unwrap();

        let entry = proj.get(&product_id).unwrap();
        assert_eq!(entry.sku, "MOUSE001");
        assert_eq!(entry.min_stock, 20);

        // Cursor advanced past the movement event.
        assert!(proj.find_by_sku("MOUSE001").is_some());
        assert!(proj.find_by_sku("OTHER").is_none());
    }
}
