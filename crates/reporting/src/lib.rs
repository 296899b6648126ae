//! `stocktrail-reporting` — read-only aggregation over the projections and
//! the movement ledger.
//!
//! Everything here is a pure function over read-model snapshots: the service
//! layer gathers catalog rows, stock levels, supplier names and movement
//! records, and this crate turns them into dashboard/report views. No function
//! in this crate mutates anything.

pub mod reports;

pub use reports::{
    category_distribution, dashboard_summary, inventory_value_cents, low_stock, recent_movements,
    stock_by_product, stock_history, stock_summary, supplier_names, CategoryCount,
    DashboardSummary, HistoryBucket, LowStockEntry, RecentMovement, StockByProduct, StockStatus,
    StockSummaryRow, DASHBOARD_HISTORY_DAYS, DASHBOARD_RECENT_MOVEMENTS,
};
