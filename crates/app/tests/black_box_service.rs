//! Black-box tests against the service boundary, exercising the operation
//! contracts the way an outer transport layer would.

use std::sync::Arc;
use std::thread;

use stocktrail_app::{InventoryError, InventoryService, NewProduct};
use stocktrail_infra::ledger::{MovementFilter, Pagination};
use stocktrail_inventory::MovementDirection;
use stocktrail_reporting::StockStatus;
use stocktrail_suppliers::ContactInfo;

fn new_product(sku: &str, name: &str, price_cents: u64, min_stock: i64, initial_quantity: i64) -> NewProduct {
    NewProduct {
        sku: sku.to_string(),
        name: name.to_string(),
        description: None,
        price_cents,
        category: "Peripherals".to_string(),
        min_stock,
        supplier_id: None,
        initial_quantity,
    }
}

#[test]
fn mouse001_lifecycle_create_move_and_query() {
    stocktrail_observability::init();
    let service = InventoryService::new();

    let product_id = service
        .create_product(new_product("MOUSE001", "Wireless Mouse", 2599, 20, 45))
        .unwrap();

    // Created with 45 on hand; above the minimum of 20.
    assert_eq!(service.current_stock(product_id), 45);
    let dashboard = service.dashboard_summary().unwrap();
    assert!(dashboard.low_stock_products.is_empty());

    // OUT 30 -> 15, now at or below the minimum.
    let stock = service
        .apply_movement(product_id, MovementDirection::Out, 30, None)
        .unwrap();
    assert_eq!(stock, 15);
    let dashboard = service.dashboard_summary().unwrap();
    assert_eq!(dashboard.low_stock_count, 1);
    assert_eq!(dashboard.low_stock_products[0].current_stock, 15);
    assert_eq!(dashboard.low_stock_products[0].min_stock, 20);

    // IN 10 -> 25, no longer low.
    let stock = service
        .apply_movement(product_id, MovementDirection::In, 10, None)
        .unwrap();
    assert_eq!(stock, 25);
    let dashboard = service.dashboard_summary().unwrap();
    assert!(dashboard.low_stock_products.is_empty());

    // The ledger holds the three movements, newest first.
    let filter = MovementFilter {
        product_id: Some(product_id),
        ..MovementFilter::default()
    };
    let result = service.list_movements(&filter, Pagination::default()).unwrap();
    assert_eq!(result.total, 3);

    let deltas: Vec<i64> = result.records.iter().map(|r| r.signed_change()).collect();
    assert_eq!(deltas, vec![10, -30, 45]);
    assert_eq!(result.records[2].note.as_deref(), Some("Initial stock"));

    // The invariant: current stock equals the ledger fold.
    let fold: i64 = result.records.iter().map(|r| r.signed_change()).sum();
    assert_eq!(service.current_stock(product_id), fold);
}

#[test]
fn current_stock_reads_are_idempotent() {
    let service = InventoryService::new();
    let product_id = service
        .create_product(new_product("KEYB001", "Keyboard", 4500, 5, 12))
        .unwrap();

    let first = service.current_stock(product_id);
    let second = service.current_stock(product_id);
    assert_eq!(first, 12);
    assert_eq!(first, second);
}

#[test]
fn concurrent_unit_inbound_movements_lose_no_updates() {
    let service = Arc::new(InventoryService::new());
    let product_id = service
        .create_product(new_product("CONC001", "Contended Product", 100, 0, 0))
        .unwrap();

    const WRITERS: usize = 8;
    const MOVEMENTS_EACH: usize = 25;

    let handles: Vec<_> = (0..WRITERS)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for _ in 0..MOVEMENTS_EACH {
                    service
                        .apply_movement(product_id, MovementDirection::In, 1, None)
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(
        service.current_stock(product_id),
        (WRITERS * MOVEMENTS_EACH) as i64
    );

    // The ledger agrees with the projection.
    let filter = MovementFilter {
        product_id: Some(product_id),
        ..MovementFilter::default()
    };
    let result = service
        .list_movements(&filter, Pagination::new(Some(1000), None))
        .unwrap();
    assert_eq!(result.total, (WRITERS * MOVEMENTS_EACH) as u64);
    assert!(service.reconcile_stock_levels().unwrap().is_empty());
}

#[test]
fn movements_on_different_products_do_not_interfere() {
    let service = Arc::new(InventoryService::new());
    let a = service
        .create_product(new_product("PAR001", "Parallel A", 100, 0, 0))
        .unwrap();
    let b = service
        .create_product(new_product("PAR002", "Parallel B", 100, 0, 0))
        .unwrap();

    let handles: Vec<_> = [(a, 40), (b, 60)]
        .into_iter()
        .map(|(product_id, count)| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for _ in 0..count {
                    service
                        .apply_movement(product_id, MovementDirection::In, 1, None)
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(service.current_stock(a), 40);
    assert_eq!(service.current_stock(b), 60);
}

#[test]
fn dashboard_and_summary_report_agree_on_a_mixed_fixture() {
    let service = InventoryService::new();

    let supplier_id = service
        .create_supplier(
            "Acme Wholesale",
            ContactInfo {
                email: Some("sales@acme.test".to_string()),
                ..ContactInfo::default()
            },
        )
        .unwrap();

    let mut mouse = new_product("MOUSE001", "Wireless Mouse", 2500, 20, 45);
    mouse.supplier_id = Some(supplier_id);
    service.create_product(mouse).unwrap();
    service
        .create_product(new_product("KEYB001", "Keyboard", 4500, 10, 10))
        .unwrap();
    service
        .create_product(new_product("CAB001", "Cable", 300, 5, 0))
        .unwrap();

    let dashboard = service.dashboard_summary().unwrap();
    assert_eq!(dashboard.total_products, 3);
    assert_eq!(dashboard.total_suppliers, 1);
    // Keyboard at its minimum and Cable at zero are low; Mouse is not.
    assert_eq!(dashboard.low_stock_count, 2);
    // 2500*45 + 4500*10 + 300*0
    assert_eq!(dashboard.total_value_cents, 157_500);
    // Initial stock movements for Mouse and Keyboard land in today's bucket.
    assert_eq!(dashboard.stock_history.len(), 1);
    assert_eq!(dashboard.stock_history[0].total_quantity, 55);
    assert_eq!(dashboard.recent_movements.len(), 2);

    let report = service.stock_summary_report().unwrap();
    let names: Vec<_> = report.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Cable", "Keyboard", "Wireless Mouse"]);

    let low_from_report: Vec<_> = report
        .iter()
        .filter(|r| r.status == StockStatus::LowStock)
        .map(|r| r.product_id)
        .collect();
    let low_from_dashboard: Vec<_> = dashboard
        .low_stock_products
        .iter()
        .map(|e| e.product_id)
        .collect();
    assert_eq!(low_from_report, low_from_dashboard);

    let mouse_row = report.iter().find(|r| r.sku == "MOUSE001").unwrap();
    assert_eq!(mouse_row.supplier_name, "Acme Wholesale");
    let cable_row = report.iter().find(|r| r.sku == "CAB001").unwrap();
    assert_eq!(cable_row.supplier_name, "N/A");
}

#[test]
fn outbound_beyond_stock_goes_negative_and_stays_consistent() {
    let service = InventoryService::new();
    let product_id = service
        .create_product(new_product("NEG001", "Oversold", 1000, 0, 5))
        .unwrap();

    let stock = service
        .apply_movement(product_id, MovementDirection::Out, 8, None)
        .unwrap();
    assert_eq!(stock, -3);

    // The valuation follows the unclamped quantity.
    let dashboard = service.dashboard_summary().unwrap();
    assert_eq!(dashboard.total_value_cents, -3000);
    assert!(service.reconcile_stock_levels().unwrap().is_empty());
}

#[test]
fn direction_filter_narrows_the_ledger() {
    let service = InventoryService::new();
    let product_id = service
        .create_product(new_product("FLT001", "Filtered", 100, 0, 20))
        .unwrap();
    service
        .apply_movement(product_id, MovementDirection::Out, 5, Some("damaged".to_string()))
        .unwrap();
    service
        .apply_movement(product_id, MovementDirection::Out, 3, None)
        .unwrap();

    let filter = MovementFilter {
        product_id: Some(product_id),
        direction: Some(MovementDirection::Out),
        ..MovementFilter::default()
    };
    let result = service
        .list_movements(&filter, Pagination::default())
        .unwrap();
    assert_eq!(result.total, 2);
    assert_eq!(result.records[1].note.as_deref(), Some("damaged"));
}

#[test]
fn unknown_product_movement_is_rejected_before_any_write() {
    let service = InventoryService::new();
    service
        .create_product(new_product("REAL001", "Real", 100, 0, 1))
        .unwrap();

    let ghost = stocktrail_inventory::ProductId::new(stocktrail_core::AggregateId::new());
    let err = service
        .apply_movement(ghost, MovementDirection::In, 5, None)
        .unwrap_err();
    assert!(matches!(err, InventoryError::UnknownProduct));

    let result = service
        .list_movements(&MovementFilter::default(), Pagination::default())
        .unwrap();
    assert_eq!(result.total, 1);
}
