use super::*;
use shared::order::{Address, PlacementErrorCode};


fn create_test_manager() -> OrdersManager {
    let storage = OrderStorage::open_in_memory().unwrap();
    OrdersManager::with_storage(storage)
}

fn test_address() -> Address {
    Address {
        street: "1 Main St".to_string(),
        city: "Springfield".to_string(),
        state: "IL".to_string(),
        zip: "62701".to_string(),
        country: "US".to_string(),
    }
}

fn cart_line(product_id: &str, seller_id: &str, unit_price: f64, quantity: u32) -> CartLine {
    CartLine {
        product_id: product_id.to_string(),
        name: format!("Product {product_id}"),
        unit_price,
        quantity,
        seller_id: seller_id.to_string(),
        stock_on_hand: 99,
        category: None,
        brand: None,
    }
}

fn place_request(lines: Vec<CartLine>) -> PlaceOrderRequest {
    PlaceOrderRequest::new("cust-1", lines, test_address(), "card")
}

fn seed_stock(manager: &OrdersManager, entries: &[(&str, u32)]) {
    for (product_id, count) in entries {
        manager.set_stock(product_id, *count).unwrap();
    }
}

// ========================================================================
// Request validation
// ========================================================================

#[test]
fn test_empty_cart_is_rejected() {
    let manager = create_test_manager();
    let request = place_request(vec![]);

    let result = manager.place_order(&request);
    assert!(matches!(result, Err(ManagerError::Validation(_))));
}

#[test]
fn test_blank_request_id_is_rejected() {
    let manager = create_test_manager();
    let mut request = place_request(vec![cart_line("prod-1", "seller-a", 10.00, 1)]);
    request.request_id = "  ".to_string();

    let result = manager.place_order(&request);
    assert!(matches!(result, Err(ManagerError::Validation(_))));
}

#[test]
fn test_blank_customer_id_is_rejected() {
    let manager = create_test_manager();
    let mut request = place_request(vec![cart_line("prod-1", "seller-a", 10.00, 1)]);
    request.customer_id = String::new();

    let result = manager.place_order(&request);
    assert!(matches!(result, Err(ManagerError::Validation(_))));
}

#[test]
fn test_incomplete_address_is_rejected() {
    let manager = create_test_manager();
    let mut request = place_request(vec![cart_line("prod-1", "seller-a", 10.00, 1)]);
    request.address.city = String::new();

    let result = manager.place_order(&request);
    assert!(matches!(result, Err(ManagerError::Validation(msg)) if msg.contains("address")));
}

#[test]
fn test_unsupported_payment_method_is_rejected() {
    let manager = create_test_manager();
    let mut request = place_request(vec![cart_line("prod-1", "seller-a", 10.00, 1)]);
    request.payment_method = "bitcoin".to_string();

    let result = manager.place_order(&request);
    assert!(
        matches!(result, Err(ManagerError::Validation(msg)) if msg.contains("unsupported payment method"))
    );
}

#[test]
fn test_zero_quantity_line_is_rejected() {
    let manager = create_test_manager();
    let request = place_request(vec![cart_line("prod-1", "seller-a", 10.00, 0)]);

    let result = manager.place_order(&request);
    assert!(matches!(result, Err(ManagerError::Validation(_))));
}

#[test]
fn test_negative_price_line_is_rejected() {
    let manager = create_test_manager();
    let request = place_request(vec![cart_line("prod-1", "seller-a", -1.00, 1)]);

    let result = manager.place_order(&request);
    assert!(matches!(result, Err(ManagerError::Validation(_))));
}

#[test]
fn test_negative_discount_is_rejected() {
    let manager = create_test_manager();
    let request = place_request(vec![cart_line("prod-1", "seller-a", 10.00, 1)])
        .with_discount("seller-a", -5.00);

    let result = manager.place_order(&request);
    assert!(matches!(result, Err(ManagerError::Validation(_))));
}

#[test]
fn test_discount_exceeding_partition_subtotal_is_rejected() {
    let manager = create_test_manager();
    seed_stock(&manager, &[("prod-1", 10)]);
    let request = place_request(vec![cart_line("prod-1", "seller-a", 10.00, 1)])
        .with_discount("seller-a", 10.01);

    let result = manager.place_order(&request);
    assert!(
        matches!(result, Err(ManagerError::Validation(msg)) if msg.contains("exceeds the partition subtotal"))
    );
    // rejected before any partition ran
    assert_eq!(manager.stock_level("prod-1").unwrap(), Some(10));
}

#[test]
fn test_validation_failure_places_nothing() {
    let manager = create_test_manager();
    seed_stock(&manager, &[("prod-1", 10)]);
    let request = place_request(vec![
        cart_line("prod-1", "seller-a", 10.00, 1),
        cart_line("prod-2", "seller-b", 10.00, 0),
    ]);

    // one malformed line fails the whole request, even for valid sellers
    assert!(manager.place_order(&request).is_err());
    assert_eq!(manager.stock_level("prod-1").unwrap(), Some(10));
    assert!(manager.orders_for_customer("cust-1").unwrap().is_empty());
}

#[test]
fn test_get_order_not_found() {
    let manager = create_test_manager();
    let result = manager.get_order("nonexistent");
    assert!(matches!(result, Err(ManagerError::OrderNotFound(_))));
}

#[test]
fn test_stock_seam_roundtrip() {
    let manager = create_test_manager();
    assert_eq!(manager.stock_level("prod-1").unwrap(), None);
    manager.set_stock("prod-1", 25).unwrap();
    assert_eq!(manager.stock_level("prod-1").unwrap(), Some(25));
}
