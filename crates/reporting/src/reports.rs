use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use stocktrail_infra::ledger::MovementRecord;
use stocktrail_infra::projections::{CatalogEntry, StockLevel, SupplierEntry};
use stocktrail_inventory::{MovementDirection, ProductId};
use stocktrail_suppliers::SupplierId;

/// How many movements the dashboard shows.
pub const DASHBOARD_RECENT_MOVEMENTS: u32 = 5;

/// Trailing window (days) for the dashboard stock history.
pub const DASHBOARD_HISTORY_DAYS: i64 = 7;

/// Current stock keyed by product, as the reports consume it.
pub type StockByProduct = HashMap<ProductId, i64>;

/// Index stock level rows by product.
pub fn stock_by_product(levels: &[StockLevel]) -> StockByProduct {
    levels.iter().map(|l| (l.product_id, l.quantity)).collect()
}

/// Index supplier display names by supplier.
pub fn supplier_names(entries: &[SupplierEntry]) -> HashMap<SupplierId, String> {
    entries
        .iter()
        .map(|e| (e.supplier_id, e.name.clone()))
        .collect()
}

fn current_stock_of(stock: &StockByProduct, product_id: &ProductId) -> i64 {
    stock.get(product_id).copied().unwrap_or(0)
}

/// A product at or below its minimum stock threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowStockEntry {
    pub product_id: ProductId,
    pub name: String,
    pub current_stock: i64,
    pub min_stock: i64,
}

/// Products where `current_stock <= min_stock`.
///
/// Non-strict comparison: a product sitting exactly at its minimum is already
/// low. Ordered by name for stable output.
pub fn low_stock(catalog: &[CatalogEntry], stock: &StockByProduct) -> Vec<LowStockEntry> {
    let mut entries: Vec<_> = catalog
        .iter()
        .filter_map(|product| {
            let current = current_stock_of(stock, &product.product_id);
            (current <= product.min_stock).then(|| LowStockEntry {
                product_id: product.product_id,
                name: product.name.clone(),
                current_stock: current,
                min_stock: product.min_stock,
            })
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

/// Total inventory value in cents: `sum(price * current_stock)`.
///
/// Products with no stock row contribute 0. Negative stock contributes
/// negatively, consistent with the unclamped quantity model.
pub fn inventory_value_cents(catalog: &[CatalogEntry], stock: &StockByProduct) -> i64 {
    catalog
        .iter()
        .map(|product| product.price_cents as i64 * current_stock_of(stock, &product.product_id))
        .sum()
}

/// Product count for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

/// Product count per category, category ascending.
///
/// An unset category groups under the empty string — its own bucket.
pub fn category_distribution(catalog: &[CatalogEntry]) -> Vec<CategoryCount> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for product in catalog {
        *counts.entry(product.category.as_str()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(category, count)| CategoryCount {
            category: category.to_string(),
            count,
        })
        .collect()
}

/// A ledger record annotated with the owning product's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentMovement {
    pub movement_id: Uuid,
    pub product_id: ProductId,
    pub product_name: String,
    pub direction: MovementDirection,
    pub quantity: i64,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// The `limit` newest movements, annotated with product names.
///
/// `movements` is expected newest-first (the ledger's query order).
pub fn recent_movements(
    movements: &[MovementRecord],
    catalog: &[CatalogEntry],
    limit: u32,
) -> Vec<RecentMovement> {
    let names: HashMap<ProductId, &str> = catalog
        .iter()
        .map(|p| (p.product_id, p.name.as_str()))
        .collect();

    movements
        .iter()
        .take(limit as usize)
        .map(|record| RecentMovement {
            movement_id: record.movement_id,
            product_id: record.product_id,
            product_name: names
                .get(&record.product_id)
                .map(|n| n.to_string())
                .unwrap_or_else(|| record.product_id.to_string()),
            direction: record.direction,
            quantity: record.quantity,
            note: record.note.clone(),
            occurred_at: record.occurred_at,
        })
        .collect()
}

/// One calendar-day bucket of ledger activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryBucket {
    pub date: NaiveDate,
    pub total_quantity: i64,
}

/// Ledger entries from the trailing `window_days`, bucketed by calendar day.
///
/// Sums the raw magnitude per bucket (not the signed delta — outbound
/// movements count toward activity just like inbound ones). Newest bucket
/// first, capped to the most recent `window_days` buckets.
pub fn stock_history(
    movements: &[MovementRecord],
    now: DateTime<Utc>,
    window_days: i64,
) -> Vec<HistoryBucket> {
    let cutoff = now - Duration::days(window_days);

    let mut buckets: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for record in movements {
        if record.occurred_at >= cutoff {
            *buckets.entry(record.occurred_at.date_naive()).or_insert(0) += record.quantity;
        }
    }

    buckets
        .into_iter()
        .rev()
        .take(window_days.max(0) as usize)
        .map(|(date, total_quantity)| HistoryBucket {
            date,
            total_quantity,
        })
        .collect()
}

/// Stock status shown on the summary report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StockStatus {
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Low Stock")]
    LowStock,
}

impl core::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StockStatus::InStock => f.write_str("In Stock"),
            StockStatus::LowStock => f.write_str("Low Stock"),
        }
    }
}

/// One row of the stock summary report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockSummaryRow {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub category: String,
    pub price_cents: u64,
    pub current_stock: i64,
    pub min_stock: i64,
    /// Supplier display name; `"N/A"` when absent or unresolved.
    pub supplier_name: String,
    pub status: StockStatus,
}

/// Per-product stock summary, name ascending.
///
/// Uses the same fold and the same non-strict threshold as [`low_stock`], so
/// the two reports always agree on which products are flagged.
pub fn stock_summary(
    catalog: &[CatalogEntry],
    stock: &StockByProduct,
    suppliers: &HashMap<SupplierId, String>,
) -> Vec<StockSummaryRow> {
    let mut rows: Vec<_> = catalog
        .iter()
        .map(|product| {
            let current = current_stock_of(stock, &product.product_id);
            let status = if current <= product.min_stock {
                StockStatus::LowStock
            } else {
                StockStatus::InStock
            };
            let supplier_name = product
                .supplier_id
                .and_then(|id| suppliers.get(&id).cloned())
                .unwrap_or_else(|| "N/A".to_string());

            StockSummaryRow {
                product_id: product.product_id,
                name: product.name.clone(),
                sku: product.sku.clone(),
                category: product.category.clone(),
                price_cents: product.price_cents,
                current_stock: current,
                min_stock: product.min_stock,
                supplier_name,
                status,
            }
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

/// The dashboard payload: headline counts plus the derived views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total_products: u64,
    pub low_stock_count: u64,
    pub total_suppliers: u64,
    pub total_value_cents: i64,
    pub stock_history: Vec<HistoryBucket>,
    pub recent_movements: Vec<RecentMovement>,
    pub category_distribution: Vec<CategoryCount>,
    pub low_stock_products: Vec<LowStockEntry>,
}

/// Assemble the dashboard from read-model snapshots.
///
/// `newest` is the all-time newest movements (at least
/// [`DASHBOARD_RECENT_MOVEMENTS`] of them); `window` covers the trailing
/// [`DASHBOARD_HISTORY_DAYS`]. Both newest-first.
pub fn dashboard_summary(
    catalog: &[CatalogEntry],
    stock: &StockByProduct,
    suppliers: &[SupplierEntry],
    newest: &[MovementRecord],
    window: &[MovementRecord],
    now: DateTime<Utc>,
) -> DashboardSummary {
    let low_stock_products = low_stock(catalog, stock);

    DashboardSummary {
        total_products: catalog.len() as u64,
        low_stock_count: low_stock_products.len() as u64,
        total_suppliers: suppliers.len() as u64,
        total_value_cents: inventory_value_cents(catalog, stock),
        stock_history: stock_history(window, now, DASHBOARD_HISTORY_DAYS),
        recent_movements: recent_movements(newest, catalog, DASHBOARD_RECENT_MOVEMENTS),
        category_distribution: category_distribution(catalog),
        low_stock_products,
    }
}
