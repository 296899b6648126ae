use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocktrail_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use stocktrail_events::Event;
use stocktrail_suppliers::SupplierId;

use crate::movement::MovementDirection;

/// Stream/aggregate type identifier for product streams.
pub const PRODUCT_AGGREGATE_TYPE: &str = "inventory.product";

/// Product identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Product.
///
/// Owns both the catalog attributes and the stock fold. Current stock is the
/// sum of signed movement deltas applied since creation; the aggregate never
/// stores a quantity that did not come from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    sku: String,
    name: String,
    description: Option<String>,
    price_cents: u64,
    category: String,
    min_stock: i64,
    supplier_id: Option<SupplierId>,
    stock: i64,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            sku: String::new(),
            name: String::new(),
            description: None,
            price_cents: 0,
            category: String::new(),
            min_stock: 0,
            supplier_id: None,
            stock: 0,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn price_cents(&self) -> u64 {
        self.price_cents
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn min_stock(&self) -> i64 {
        self.min_stock
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    /// Current stock: the fold of all movement deltas applied so far.
    pub fn stock(&self) -> i64 {
        self.stock
    }

    /// Whether current stock is at or below the configured minimum.
    ///
    /// Non-strict comparison: a product sitting exactly at its minimum is
    /// already low.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

/// Canonical SKU form: trimmed, uppercase.
///
/// Normalization happens once, inside the aggregate; any aliasing between
/// external field spellings belongs at the transport boundary.
pub fn normalize_sku(sku: &str) -> String {
    sku.trim().to_uppercase()
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: u64,
    pub category: String,
    pub min_stock: i64,
    pub supplier_id: Option<SupplierId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordMovement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMovement {
    pub product_id: ProductId,
    pub direction: MovementDirection,
    /// Magnitude of the movement. Must be positive; the direction carries the sign.
    pub quantity: i64,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryCommand {
    CreateProduct(CreateProduct),
    RecordMovement(RecordMovement),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: u64,
    pub category: String,
    pub min_stock: i64,
    pub supplier_id: Option<SupplierId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockMovementRecorded.
///
/// One ledger entry. Immutable once appended; corrections are modeled as new
/// compensating movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovementRecorded {
    pub product_id: ProductId,
    pub direction: MovementDirection,
    pub quantity: i64,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl StockMovementRecorded {
    /// Signed stock delta carried by this movement.
    pub fn signed_delta(&self) -> i64 {
        self.direction.signed(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    ProductCreated(ProductCreated),
    StockMovementRecorded(StockMovementRecorded),
}

impl InventoryEvent {
    pub fn product_id(&self) -> ProductId {
        match self {
            InventoryEvent::ProductCreated(e) => e.product_id,
            InventoryEvent::StockMovementRecorded(e) => e.product_id,
        }
    }
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::ProductCreated(_) => "inventory.product.created",
            InventoryEvent::StockMovementRecorded(_) => "inventory.product.movement_recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::ProductCreated(e) => e.occurred_at,
            InventoryEvent::StockMovementRecorded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = InventoryCommand;
    type Event = InventoryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InventoryEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.sku = e.sku.clone();
                self.name = e.name.clone();
                self.description = e.description.clone();
                self.price_cents = e.price_cents;
                self.category = e.category.clone();
                self.min_stock = e.min_stock;
                self.supplier_id = e.supplier_id;
                self.stock = 0;
                self.created = true;
            }
            InventoryEvent::StockMovementRecorded(e) => {
                self.stock += e.signed_delta();
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InventoryCommand::CreateProduct(cmd) => self.handle_create(cmd),
            InventoryCommand::RecordMovement(cmd) => self.handle_movement(cmd),
        }
    }
}

impl Product {
    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<InventoryEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        let sku = normalize_sku(&cmd.sku);
        if sku.is_empty() {
            return Err(DomainError::validation("SKU cannot be empty"));
        }

        if cmd.min_stock < 0 {
            return Err(DomainError::validation("minimum stock cannot be negative"));
        }

        // SKU uniqueness across products requires a catalog-wide view; the
        // service layer checks it before dispatching this command.

        Ok(vec![InventoryEvent::ProductCreated(ProductCreated {
            product_id: cmd.product_id,
            sku,
            name: cmd.name.trim().to_string(),
            description: cmd.description.clone(),
            price_cents: cmd.price_cents,
            category: cmd.category.trim().to_string(),
            min_stock: cmd.min_stock,
            supplier_id: cmd.supplier_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_movement(&self, cmd: &RecordMovement) -> Result<Vec<InventoryEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_product_id(cmd.product_id)?;

        if cmd.quantity <= 0 {
            return Err(DomainError::validation("movement quantity must be positive"));
        }

        // No floor on the resulting stock: an outbound movement may drive the
        // quantity negative. Whether that should be rejected is an open product
        // question; the ledger records what was reported.

        Ok(vec![InventoryEvent::StockMovementRecorded(StockMovementRecorded {
            product_id: cmd.product_id,
            direction: cmd.direction,
            quantity: cmd.quantity,
            note: cmd.note.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product_id() -> ProductId {
        ProductId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn create_cmd(product_id: ProductId) -> CreateProduct {
        CreateProduct {
            product_id,
            sku: "sku-001".to_string(),
            name: "Test Product".to_string(),
            description: None,
            price_cents: 1999,
            category: "Peripherals".to_string(),
            min_stock: 5,
            supplier_id: None,
            occurred_at: test_time(),
        }
    }

    fn created_product() -> Product {
        let product_id = test_product_id();
        let mut product = Product::empty(product_id);
        let events = product
            .handle(&InventoryCommand::CreateProduct(create_cmd(product_id)))
            .unwrap();
        product.apply(&events[0]);
        product
    }

    fn movement_cmd(
        product_id: ProductId,
        direction: MovementDirection,
        quantity: i64,
    ) -> RecordMovement {
        RecordMovement {
            product_id,
            direction,
            quantity,
            note: None,
            occurred_at: test_time(),
        }
    }

    #[test]
    fn create_product_emits_created_event_with_normalized_sku() {
        let product_id = test_product_id();
        let product = Product::empty(product_id);
        let events = product
            .handle(&InventoryCommand::CreateProduct(create_cmd(product_id)))
            .unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            InventoryEvent::ProductCreated(e) => {
                assert_eq!(e.product_id, product_id);
                assert_eq!(e.sku, "SKU-001");
                assert_eq!(e.name, "Test Product");
                assert_eq!(e.min_stock, 5);
            }
            _ => panic!("Expected ProductCreated event"),
        }
    }

    #[test]
    fn create_product_rejects_empty_name() {
        let product_id = test_product_id();
        let product = Product::empty(product_id);
        let mut cmd = create_cmd(product_id);
        cmd.name = "   ".to_string();

        let err = product
            .handle(&InventoryCommand::CreateProduct(cmd))
            .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for empty name"),
        }
    }

    #[test]
    fn create_product_rejects_empty_sku() {
        let product_id = test_product_id();
        let product = Product::empty(product_id);
        let mut cmd = create_cmd(product_id);
        cmd.sku = "   ".to_string();

        let err = product
            .handle(&InventoryCommand::CreateProduct(cmd))
            .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for empty SKU"),
        }
    }

    #[test]
    fn create_product_rejects_negative_min_stock() {
        let product_id = test_product_id();
        let product = Product::empty(product_id);
        let mut cmd = create_cmd(product_id);
        cmd.min_stock = -1;

        let err = product
            .handle(&InventoryCommand::CreateProduct(cmd))
            .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for negative min stock"),
        }
    }

    #[test]
    fn create_product_rejects_duplicate_creation() {
        let product = created_product();
        let err = product
            .handle(&InventoryCommand::CreateProduct(create_cmd(product.id_typed())))
            .unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict error for duplicate creation"),
        }
    }

    #[test]
    fn creation_starts_stock_at_zero() {
        let product = created_product();
        assert_eq!(product.stock(), 0);
        assert_eq!(product.version(), 1);
    }

    #[test]
    fn movements_fold_into_stock() {
        let mut product = created_product();
        let id = product.id_typed();

        for (direction, qty) in [
            (MovementDirection::In, 45),
            (MovementDirection::Out, 30),
            (MovementDirection::In, 10),
        ] {
            let events = product
                .handle(&InventoryCommand::RecordMovement(movement_cmd(id, direction, qty)))
                .unwrap();
            product.apply(&events[0]);
        }

        assert_eq!(product.stock(), 25);
        assert_eq!(product.version(), 4);
    }

    #[test]
    fn movement_rejects_zero_and_negative_quantity() {
        let product = created_product();
        let id = product.id_typed();

        for qty in [0, -3] {
            let err = product
                .handle(&InventoryCommand::RecordMovement(movement_cmd(
                    id,
                    MovementDirection::In,
                    qty,
                )))
                .unwrap_err();
            match err {
                DomainError::Validation(_) => {}
                _ => panic!("Expected Validation error for quantity {qty}"),
            }
        }
    }

    #[test]
    fn movement_rejects_unknown_product() {
        let product = Product::empty(test_product_id());
        let err = product
            .handle(&InventoryCommand::RecordMovement(movement_cmd(
                product.id_typed(),
                MovementDirection::In,
                1,
            )))
            .unwrap_err();
        match err {
            DomainError::NotFound => {}
            _ => panic!("Expected NotFound error for unknown product"),
        }
    }

    #[test]
    fn movement_rejects_mismatched_product_id() {
        let product = created_product();
        let other = test_product_id();

        let err = product
            .handle(&InventoryCommand::RecordMovement(movement_cmd(
                other,
                MovementDirection::In,
                1,
            )))
            .unwrap_err();
        match err {
            DomainError::InvariantViolation(_) => {}
            _ => panic!("Expected InvariantViolation for product_id mismatch"),
        }
    }

    #[test]
    fn outbound_may_drive_stock_negative() {
        let mut product = created_product();
        let id = product.id_typed();

        let events = product
            .handle(&InventoryCommand::RecordMovement(movement_cmd(
                id,
                MovementDirection::Out,
                7,
            )))
            .unwrap();
        product.apply(&events[0]);

        assert_eq!(product.stock(), -7);
    }

    #[test]
    fn low_stock_is_non_strict_at_the_threshold() {
        let mut product = created_product();
        let id = product.id_typed();

        // min_stock is 5. Stock 5 is low, stock 6 is not.
        let events = product
            .handle(&InventoryCommand::RecordMovement(movement_cmd(
                id,
                MovementDirection::In,
                5,
            )))
            .unwrap();
        product.apply(&events[0]);
        assert!(product.is_low_stock());

        let events = product
            .handle(&InventoryCommand::RecordMovement(movement_cmd(
                id,
                MovementDirection::In,
                1,
            )))
            .unwrap();
        product.apply(&events[0]);
        assert!(!product.is_low_stock());
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let product = created_product();
        let before = product.clone();

        let _ = product.handle(&InventoryCommand::RecordMovement(movement_cmd(
            product.id_typed(),
            MovementDirection::In,
            3,
        )));

        assert_eq!(product, before);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn direction_strategy() -> impl Strategy<Value = MovementDirection> {
            prop_oneof![Just(MovementDirection::In), Just(MovementDirection::Out)]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: stock always equals the sum of signed movement deltas.
            #[test]
            fn stock_equals_sum_of_signed_deltas(
                movements in proptest::collection::vec((direction_strategy(), 1i64..10_000), 0..50)
            ) {
                let mut product = created_product();
                let id = product.id_typed();
                let mut expected = 0i64;

                for (direction, qty) in movements {
                    let events = product
                        .handle(&InventoryCommand::RecordMovement(movement_cmd(id, direction, qty)))
                        .unwrap();
                    product.apply(&events[0]);
                    expected += direction.signed(qty);
                }

                prop_assert_eq!(product.stock(), expected);
            }

            /// Property: apply is deterministic (same events, same final state).
            #[test]
            fn apply_is_deterministic(
                movements in proptest::collection::vec((direction_strategy(), 1i64..10_000), 1..30)
            ) {
                let product_id = test_product_id();
                let mut events = vec![InventoryEvent::ProductCreated(ProductCreated {
                    product_id,
                    sku: "SKU-001".to_string(),
                    name: "Test Product".to_string(),
                    description: None,
                    price_cents: 100,
                    category: String::new(),
                    min_stock: 0,
                    supplier_id: None,
                    occurred_at: Utc::now(),
                })];
                for (direction, qty) in movements {
                    events.push(InventoryEvent::StockMovementRecorded(StockMovementRecorded {
                        product_id,
                        direction,
                        quantity: qty,
                        note: None,
                        occurred_at: Utc::now(),
                    }));
                }

                let mut a = Product::empty(product_id);
                let mut b = Product::empty(product_id);
                for event in &events {
                    a.apply(event);
                    b.apply(event);
                }

                prop_assert_eq!(a.stock(), b.stock());
                prop_assert_eq!(a.version(), b.version());
                prop_assert_eq!(a.version(), events.len() as u64);
            }

            /// Property: handle never mutates, so repeated decisions agree.
            #[test]
            fn handle_is_deterministic(qty in 1i64..10_000) {
                let product = created_product();
                let cmd = InventoryCommand::RecordMovement(movement_cmd(
                    product.id_typed(),
                    MovementDirection::In,
                    qty,
                ));

                let first = product.handle(&cmd).unwrap();
                let second = product.handle(&cmd).unwrap();
                prop_assert_eq!(first, second);
            }
        }
    }
}
