//! The inventory service: operation contracts over the event-sourced core.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{Duration, Utc};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use stocktrail_core::AggregateId;
use stocktrail_events::{EventEnvelope, InMemoryEventBus};
use stocktrail_infra::command_dispatcher::{CommandDispatcher, DispatchError};
use stocktrail_infra::event_store::{EventStore, InMemoryEventStore, StoredEvent};
use stocktrail_infra::ledger::{MovementFilter, MovementLedger, MovementQueryResult, Pagination};
use stocktrail_infra::projections::{
    CatalogEntry, ProductCatalogProjection, ProjectionError, StockDrift, StockLevel,
    StockLevelsProjection, SupplierDirectoryProjection, SupplierEntry,
};
use stocktrail_infra::read_model::InMemoryReadModelStore;
use stocktrail_inventory::{
    normalize_sku, CreateProduct, InventoryCommand, MovementDirection, Product, ProductId,
    RecordMovement, PRODUCT_AGGREGATE_TYPE,
};
use stocktrail_reporting::{DashboardSummary, StockSummaryRow, DASHBOARD_HISTORY_DAYS};
use stocktrail_suppliers::{
    ContactInfo, CreateSupplier, Supplier, SupplierCommand, SupplierId, SUPPLIER_AGGREGATE_TYPE,
};

use crate::error::InventoryError;

type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
type CatalogStore = Arc<InMemoryReadModelStore<ProductId, CatalogEntry>>;
type StockStore = Arc<InMemoryReadModelStore<ProductId, StockLevel>>;
type SupplierStore = Arc<InMemoryReadModelStore<SupplierId, SupplierEntry>>;

/// Input for the create-product operation.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: u64,
    pub category: String,
    pub min_stock: i64,
    pub supplier_id: Option<SupplierId>,
    pub initial_quantity: i64,
}

/// Application service wiring the event-sourced core to its read models.
///
/// Requests are stateless across calls; all shared state lives in the event
/// store and the disposable read models. Writers on the same product
/// serialize through per-stream optimistic concurrency (with retry), writers
/// on different products proceed in parallel, and readers never lock.
pub struct InventoryService {
    dispatcher: CommandDispatcher<Arc<InMemoryEventStore>, Bus>,
    store: Arc<InMemoryEventStore>,
    ledger: MovementLedger<Arc<InMemoryEventStore>>,
    catalog: ProductCatalogProjection<CatalogStore>,
    stock: StockLevelsProjection<StockStore>,
    suppliers: SupplierDirectoryProjection<SupplierStore>,
    /// Canonical SKU -> product. Reserved before dispatch so concurrent
    /// creates cannot both pass the uniqueness check.
    sku_index: RwLock<HashMap<String, ProductId>>,
}

impl InventoryService {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryEventStore::new());
        let bus: Bus = Arc::new(InMemoryEventBus::new());

        Self {
            dispatcher: CommandDispatcher::new(store.clone(), bus),
            ledger: MovementLedger::new(store.clone()),
            store,
            catalog: ProductCatalogProjection::new(Arc::new(InMemoryReadModelStore::new())),
            stock: StockLevelsProjection::new(Arc::new(InMemoryReadModelStore::new())),
            suppliers: SupplierDirectoryProjection::new(Arc::new(InMemoryReadModelStore::new())),
            sku_index: RwLock::new(HashMap::new()),
        }
    }

    /// Create a product, optionally seeding stock with one synthetic inbound
    /// movement noted "Initial stock".
    pub fn create_product(&self, input: NewProduct) -> Result<ProductId, InventoryError> {
        if input.initial_quantity < 0 {
            return Err(InventoryError::Validation(
                "initial quantity cannot be negative".to_string(),
            ));
        }

        let sku = normalize_sku(&input.sku);
        if sku.is_empty() {
            return Err(InventoryError::Validation("SKU cannot be empty".to_string()));
        }

        let product_id = ProductId::new(AggregateId::new());

        {
            let mut index = self
                .sku_index
                .write()
                .map_err(|_| InventoryError::StorageUnavailable("sku index lock poisoned".to_string()))?;
            if index.contains_key(&sku) {
                return Err(InventoryError::DuplicateSku(sku));
            }
            index.insert(sku.clone(), product_id);
        }

        let command = InventoryCommand::CreateProduct(CreateProduct {
            product_id,
            sku: sku.clone(),
            name: input.name,
            description: input.description,
            price_cents: input.price_cents,
            category: input.category,
            min_stock: input.min_stock,
            supplier_id: input.supplier_id,
            occurred_at: Utc::now(),
        });

        let committed = match self.dispatcher.dispatch(
            product_id.0,
            PRODUCT_AGGREGATE_TYPE,
            command,
            |id| Product::empty(ProductId::new(id)),
        ) {
            Ok(committed) => committed,
            Err(err) => {
                // Release the reservation; nothing was written.
                if let Ok(mut index) = self.sku_index.write() {
                    index.remove(&sku);
                }
                return Err(map_create_error(err));
            }
        };

        self.project(&committed)?;
        info!(%product_id, %sku, "product created");

        if input.initial_quantity > 0 {
            self.apply_movement(
                product_id,
                MovementDirection::In,
                input.initial_quantity,
                Some("Initial stock".to_string()),
            )?;
        }

        Ok(product_id)
    }

    /// Apply one stock movement and return the updated quantity.
    ///
    /// The append is the single atomic step: the ledger entry and the stock
    /// change are the same event, so the two can never diverge. Concurrent
    /// movements on the same product lose the optimistic-concurrency check and
    /// retry against the fresh stream head, which serializes them without
    /// blocking movements on other products.
    pub fn apply_movement(
        &self,
        product_id: ProductId,
        direction: MovementDirection,
        quantity: i64,
        note: Option<String>,
    ) -> Result<i64, InventoryError> {
        loop {
            let command = InventoryCommand::RecordMovement(RecordMovement {
                product_id,
                direction,
                quantity,
                note: note.clone(),
                occurred_at: Utc::now(),
            });

            match self.dispatcher.dispatch(
                product_id.0,
                PRODUCT_AGGREGATE_TYPE,
                command,
                |id| Product::empty(ProductId::new(id)),
            ) {
                Ok(committed) => {
                    self.project(&committed)?;
                    debug!(%product_id, %direction, quantity, "movement recorded");
                    return Ok(self.stock.current(&product_id));
                }
                Err(DispatchError::Concurrency(_)) => {
                    debug!(%product_id, "movement lost optimistic concurrency check, retrying");
                    std::thread::yield_now();
                }
                Err(err) => return Err(map_movement_error(err)),
            }
        }
    }

    /// Current stock for a product.
    ///
    /// Returns 0 when the product has no stream or stock row — reads never
    /// fail on unknown products.
    pub fn current_stock(&self, product_id: ProductId) -> i64 {
        self.stock.current(&product_id)
    }

    /// Query the movement ledger, newest first.
    pub fn list_movements(
        &self,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementQueryResult, InventoryError> {
        self.ledger
            .query(filter, pagination)
            .map_err(|e| InventoryError::StorageUnavailable(e.to_string()))
    }

    /// Create a supplier for the directory.
    pub fn create_supplier(
        &self,
        name: impl Into<String>,
        contact: ContactInfo,
    ) -> Result<SupplierId, InventoryError> {
        let supplier_id = SupplierId::new(AggregateId::new());
        let command = SupplierCommand::CreateSupplier(CreateSupplier {
            supplier_id,
            name: name.into(),
            contact,
            occurred_at: Utc::now(),
        });

        let committed = self
            .dispatcher
            .dispatch(supplier_id.0, SUPPLIER_AGGREGATE_TYPE, command, |id| {
                Supplier::empty(SupplierId::new(id))
            })
            .map_err(map_create_error)?;

        self.project(&committed)?;
        info!(%supplier_id, "supplier created");
        Ok(supplier_id)
    }

    /// List catalog entries joined with their current stock, name ascending.
    pub fn list_products(&self) -> Vec<(CatalogEntry, i64)> {
        let mut products: Vec<_> = self
            .catalog
            .list()
            .into_iter()
            .map(|entry| {
                let current = self.stock.current(&entry.product_id);
                (entry, current)
            })
            .collect();
        products.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        products
    }

    /// The dashboard payload (headline counts + derived views).
    pub fn dashboard_summary(&self) -> Result<DashboardSummary, InventoryError> {
        let catalog = self.catalog.list();
        let stock = stocktrail_reporting::stock_by_product(&self.stock.list());
        let suppliers = self.suppliers.list();
        let now = Utc::now();

        let newest = self
            .ledger
            .recent(stocktrail_reporting::DASHBOARD_RECENT_MOVEMENTS)
            .map_err(|e| InventoryError::StorageUnavailable(e.to_string()))?;
        let window = self
            .ledger
            .since(now - Duration::days(DASHBOARD_HISTORY_DAYS))
            .map_err(|e| InventoryError::StorageUnavailable(e.to_string()))?;

        Ok(stocktrail_reporting::dashboard_summary(
            &catalog, &stock, &suppliers, &newest, &window, now,
        ))
    }

    /// The per-product stock summary report, name ascending.
    pub fn stock_summary_report(&self) -> Result<Vec<StockSummaryRow>, InventoryError> {
        let catalog = self.catalog.list();
        let stock = stocktrail_reporting::stock_by_product(&self.stock.list());
        let suppliers = stocktrail_reporting::supplier_names(&self.suppliers.list());

        Ok(stocktrail_reporting::stock_summary(&catalog, &stock, &suppliers))
    }

    /// Recompute every stock level from the ledger, correcting and reporting
    /// any drift.
    ///
    /// With stock defined as a fold of the ledger this is expected to find
    /// nothing; it exists as the operational safeguard for the cached read
    /// model. Not safe to run concurrently with writers — intended for
    /// maintenance windows and tests.
    pub fn reconcile_stock_levels(&self) -> Result<Vec<StockDrift>, InventoryError> {
        let envelopes: Vec<_> = self
            .store
            .load_all()
            .map_err(|e| InventoryError::StorageUnavailable(e.to_string()))?
            .iter()
            .map(StoredEvent::to_envelope)
            .collect();

        let drift = self
            .stock
            .reconcile(envelopes)
            .map_err(|e| InventoryError::StorageUnavailable(e.to_string()))?;

        for d in &drift {
            warn!(
                product_id = %d.product_id,
                stored = d.stored,
                recomputed = d.recomputed,
                "stock level drift corrected"
            );
        }

        Ok(drift)
    }

    /// Apply committed events to all read models (read-your-writes).
    fn project(&self, committed: &[StoredEvent]) -> Result<(), InventoryError> {
        for stored in committed {
            let envelope = stored.to_envelope();
            match self.apply_to_projections(&envelope) {
                Ok(()) => {}
                Err(ProjectionError::NonMonotonicSequence { .. }) => {
                    // A concurrent writer's earlier envelope has not been
                    // projected yet; catch up from the stream. Idempotent —
                    // duplicates are skipped by the cursors.
                    self.project_stream(stored.aggregate_id)?;
                }
                Err(err) => return Err(InventoryError::StorageUnavailable(err.to_string())),
            }
        }
        Ok(())
    }

    fn apply_to_projections(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        self.stock.apply_envelope(envelope)?;
        self.catalog.apply_envelope(envelope)?;
        self.suppliers.apply_envelope(envelope)?;
        Ok(())
    }

    fn project_stream(&self, aggregate_id: AggregateId) -> Result<(), InventoryError> {
        let stream = self
            .store
            .load_stream(aggregate_id)
            .map_err(|e| InventoryError::StorageUnavailable(e.to_string()))?;

        for stored in &stream {
            self.apply_to_projections(&stored.to_envelope())
                .map_err(|e| InventoryError::StorageUnavailable(e.to_string()))?;
        }
        Ok(())
    }
}

impl Default for InventoryService {
    fn default() -> Self {
        Self::new()
    }
}

fn map_create_error(err: DispatchError) -> InventoryError {
    match err {
        DispatchError::Validation(msg) | DispatchError::InvariantViolation(msg) => {
            InventoryError::Validation(msg)
        }
        DispatchError::NotFound => InventoryError::UnknownProduct,
        DispatchError::Concurrency(msg) => {
            InventoryError::StorageUnavailable(format!("concurrent modification: {msg}"))
        }
        DispatchError::Deserialize(msg) | DispatchError::Publish(msg) => {
            InventoryError::StorageUnavailable(msg)
        }
        DispatchError::Store(e) => InventoryError::StorageUnavailable(e.to_string()),
    }
}

fn map_movement_error(err: DispatchError) -> InventoryError {
    match err {
        DispatchError::NotFound => InventoryError::UnknownProduct,
        DispatchError::Validation(msg) | DispatchError::InvariantViolation(msg) => {
            InventoryError::InvalidMovement(msg)
        }
        DispatchError::Concurrency(msg) => {
            InventoryError::StorageUnavailable(format!("concurrent modification: {msg}"))
        }
        DispatchError::Deserialize(msg) | DispatchError::Publish(msg) => {
            InventoryError::StorageUnavailable(msg)
        }
        DispatchError::Store(e) => InventoryError::StorageUnavailable(e.to_string()),
    }
}
