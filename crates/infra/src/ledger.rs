//! Movement ledger queries.
//!
//! The ledger is the set of `StockMovementRecorded` events across all product
//! streams, read in reverse global append order (newest first). Append order
//! is the ordering authority: re-running a query after further appends may
//! surface new records, but the relative order of previously returned records
//! never changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use stocktrail_inventory::{InventoryEvent, MovementDirection, ProductId, PRODUCT_AGGREGATE_TYPE};

use crate::event_store::{EventStore, EventStoreError, StoredEvent};

/// Pagination parameters for ledger queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of records to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50, // Safe default
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(50).min(1000), // Cap at 1000 for safety
            offset: offset.unwrap_or(0),
        }
    }
}

/// Filter criteria for ledger queries (conjunction of the set fields).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementFilter {
    /// Filter by product (optional).
    pub product_id: Option<ProductId>,
    /// Filter by movement direction (optional).
    pub direction: Option<MovementDirection>,
    /// Half-open time range `[start, end)` on business time (both optional).
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl MovementFilter {
    fn matches(&self, record: &MovementRecord) -> bool {
        if let Some(product_id) = self.product_id {
            if record.product_id != product_id {
                return false;
            }
        }
        if let Some(direction) = self.direction {
            if record.direction != direction {
                return false;
            }
        }
        if let Some(start) = self.start {
            if record.occurred_at < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if record.occurred_at >= end {
                return false;
            }
        }
        true
    }
}

/// One ledger entry, materialized from a stored movement event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub movement_id: Uuid,
    pub product_id: ProductId,
    pub direction: MovementDirection,
    /// Magnitude of the movement (always positive).
    pub quantity: i64,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
    /// Position within the product's stream.
    pub sequence_number: u64,
}

impl MovementRecord {
    /// Signed stock delta: `+quantity` for IN, `-quantity` for OUT.
    pub fn signed_change(&self) -> i64 {
        self.direction.signed(self.quantity)
    }
}

/// Paginated ledger query result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementQueryResult {
    /// Records matching the query, newest first.
    pub records: Vec<MovementRecord>,
    /// Total number of records matching the filter (across all pages).
    pub total: u64,
    /// Pagination parameters used.
    pub pagination: Pagination,
    /// Whether more records are available.
    pub has_more: bool,
}

/// Ledger query error.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Store(#[from] EventStoreError),

    #[error("failed to deserialize movement payload: {0}")]
    Deserialize(String),
}

/// Read-only query interface over the movement ledger.
#[derive(Debug)]
pub struct MovementLedger<S> {
    store: S,
}

impl<S> MovementLedger<S>
where
    S: EventStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Query movements matching `filter`, newest first.
    pub fn query(
        &self,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementQueryResult, LedgerError> {
        let mut matches = Vec::new();

        for stored in self.store.load_all()?.iter().rev() {
            if let Some(record) = movement_record(stored)? {
                if filter.matches(&record) {
                    matches.push(record);
                }
            }
        }

        let total = matches.len() as u64;
        let offset = pagination.offset as usize;
        let limit = pagination.limit as usize;
        let records: Vec<_> = matches.into_iter().skip(offset).take(limit).collect();
        let has_more = (offset + records.len()) < total as usize;

        Ok(MovementQueryResult {
            records,
            total,
            pagination,
            has_more,
        })
    }

    /// The `limit` newest movements across all products.
    pub fn recent(&self, limit: u32) -> Result<Vec<MovementRecord>, LedgerError> {
        Ok(self
            .query(&MovementFilter::default(), Pagination::new(Some(limit), None))?
            .records)
    }

    /// All movements with business time at or after `cutoff`, newest first.
    ///
    /// Unpaginated: report bucketing needs the complete trailing window.
    pub fn since(&self, cutoff: DateTime<Utc>) -> Result<Vec<MovementRecord>, LedgerError> {
        let mut records = Vec::new();
        for stored in self.store.load_all()?.iter().rev() {
            if let Some(record) = movement_record(stored)? {
                if record.occurred_at >= cutoff {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }
}

/// Materialize a movement record from a stored event, skipping non-movement events.
fn movement_record(stored: &StoredEvent) -> Result<Option<MovementRecord>, LedgerError> {
    if stored.aggregate_type != PRODUCT_AGGREGATE_TYPE {
        return Ok(None);
    }

    let event: InventoryEvent = serde_json::from_value(stored.payload.clone())
        .map_err(|e| LedgerError::Deserialize(e.to_string()))?;

    match event {
        InventoryEvent::StockMovementRecorded(e) => Ok(Some(MovementRecord {
            movement_id: stored.event_id,
            product_id: e.product_id,
            direction: e.direction,
            quantity: e.quantity,
            note: e.note,
            occurred_at: e.occurred_at,
            sequence_number: stored.sequence_number,
        })),
        InventoryEvent::ProductCreated(_) => Ok(None),
    }
}
