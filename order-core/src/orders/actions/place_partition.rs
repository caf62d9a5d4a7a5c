//! PlacePartition command handler
//!
//! Places one seller's partition of a cart as a single order: re-checks and
//! decrements live stock, freezes line copies and the money split, and marks
//! the partition's idempotency key, all inside the caller's transaction.

use crate::core::config::FeeConfig;
use crate::orders::money::{line_subtotal, order_totals, to_decimal, to_f64};
use crate::orders::storage::placement_key;
use crate::orders::traits::{CommandContext, CommandHandler, OrderError};
use rust_decimal::Decimal;
use shared::order::{
    Address, CartLine, EventPayload, Order, OrderEvent, OrderEventType, OrderLine, OrderStatus,
    PaymentMethod, PaymentStatus,
};
use shared::util::now_millis;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// PlacePartition action
///
/// `order_id` and `order_number` are allocated by the caller before the
/// transaction opens (redb 不支持嵌套写事务); a partition that fails after
/// allocation burns its number.
#[derive(Debug, Clone)]
pub struct PlacePartitionAction {
    pub request_id: String,
    pub customer_id: String,
    pub seller_id: String,
    pub lines: Vec<CartLine>,
    pub address: Address,
    pub payment_method: PaymentMethod,
    pub discount_amount: f64,
    pub order_id: String,
    pub order_number: String,
    pub fees: FeeConfig,
    pub delivery_lead_days: i64,
}

impl CommandHandler for PlacePartitionAction {
    fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<Vec<OrderEvent>, OrderError> {
        // 1. Re-check live stock and decrement, line by line. The client's
        //    stock_on_hand is audit data; the ledger row decides.
        for line in &self.lines {
            let available = ctx.stock_level(&line.product_id)?;
            let Some(remaining) = available.checked_sub(line.quantity) else {
                return Err(OrderError::InsufficientStock {
                    product_id: line.product_id.clone(),
                    requested: line.quantity,
                    available,
                });
            };
            ctx.put_stock(&line.product_id, remaining)?;
        }

        // 2. Freeze line copies with rounded line totals
        let lines: Vec<OrderLine> = self
            .lines
            .iter()
            .map(|line| OrderLine {
                product_id: line.product_id.clone(),
                name: line.name.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity,
                line_total: to_f64(to_decimal(line.unit_price) * Decimal::from(line.quantity)),
                category: line.category.clone(),
                brand: line.brand.clone(),
            })
            .collect();

        // 3. Money split for this partition
        let totals = order_totals(
            line_subtotal(&self.lines),
            to_decimal(self.discount_amount),
            &self.fees,
        );

        // 4. Payment status: cash on delivery settles at the door, every
        //    other method is captured upstream before placement reaches us
        let payment_status = match self.payment_method {
            PaymentMethod::Cod => PaymentStatus::Pending,
            _ => PaymentStatus::Paid,
        };

        let now = now_millis();
        let order = Order {
            id: self.order_id.clone(),
            order_number: self.order_number.clone(),
            customer_id: self.customer_id.clone(),
            seller_id: self.seller_id.clone(),
            lines,
            subtotal: totals.subtotal,
            delivery_fee: totals.delivery_fee,
            service_fee: totals.service_fee,
            discount_amount: totals.discount_amount,
            total: totals.total,
            status: OrderStatus::Pending,
            payment_method: self.payment_method,
            payment_status,
            address: self.address.clone(),
            cancel_reason: None,
            created_at: now,
            updated_at: now,
            estimated_delivery: now + self.delivery_lead_days * MILLIS_PER_DAY,
        };

        // 5. Persist the order and the idempotency mark atomically
        ctx.save_order(&order)?;
        ctx.mark_request_processed(
            &placement_key(&self.request_id, &self.seller_id),
            &order.id,
        )?;

        Ok(vec![OrderEvent::new(
            order.id.clone(),
            OrderEventType::OrderCreated,
            EventPayload::OrderCreated { order },
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::storage::OrderStorage;

    fn test_address() -> Address {
        Address {
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip: "62701".to_string(),
            country: "US".to_string(),
        }
    }

    fn cart_line(product_id: &str, unit_price: f64, quantity: u32) -> CartLine {
        CartLine {
            product_id: product_id.to_string(),
            name: format!("Product {product_id}"),
            unit_price,
            quantity,
            seller_id: "seller-a".to_string(),
            stock_on_hand: 99,
            category: None,
            brand: None,
        }
    }

    fn create_place_action(lines: Vec<CartLine>) -> PlacePartitionAction {
        PlacePartitionAction {
            request_id: "req-1".to_string(),
            customer_id: "cust-1".to_string(),
            seller_id: "seller-a".to_string(),
            lines,
            address: test_address(),
            payment_method: PaymentMethod::Card,
            discount_amount: 0.0,
            order_id: "order-1".to_string(),
            order_number: "ORD-2024-0001".to_string(),
            fees: FeeConfig::default(),
            delivery_lead_days: 5,
        }
    }

    #[test]
    fn test_place_partition_freezes_order() {
        let storage = OrderStorage::open_in_memory().unwrap();
        storage.set_stock("prod-1", 10).unwrap();

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage);

        let action = create_place_action(vec![cart_line("prod-1", 10.00, 2)]);
        let events = action.execute(&mut ctx).unwrap();
        txn.commit().unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, OrderEventType::OrderCreated);

        let order = storage.get_order("order-1").unwrap().unwrap();
        assert_eq!(order.order_number, "ORD-2024-0001");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.subtotal, 20.00);
        assert_eq!(order.delivery_fee, 5.00);
        assert_eq!(order.service_fee, 0.40);
        assert_eq!(order.total, 25.40);
        assert_eq!(order.lines[0].line_total, 20.00);
        assert_eq!(
            order.estimated_delivery,
            order.created_at + 5 * MILLIS_PER_DAY
        );

        // stock decremented in the same transaction
        assert_eq!(storage.stock_level("prod-1").unwrap(), Some(8));
    }

    #[test]
    fn test_insufficient_stock_rejects_partition() {
        let storage = OrderStorage::open_in_memory().unwrap();
        storage.set_stock("prod-1", 1).unwrap();

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage);

        let action = create_place_action(vec![cart_line("prod-1", 10.00, 2)]);
        let result = action.execute(&mut ctx);

        assert!(matches!(
            result,
            Err(OrderError::InsufficientStock {
                requested: 2,
                available: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_exact_stock_drains_to_zero() {
        let storage = OrderStorage::open_in_memory().unwrap();
        storage.set_stock("prod-1", 2).unwrap();

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage);

        let action = create_place_action(vec![cart_line("prod-1", 10.00, 2)]);
        action.execute(&mut ctx).unwrap();
        txn.commit().unwrap();

        assert_eq!(storage.stock_level("prod-1").unwrap(), Some(0));
    }

    #[test]
    fn test_unknown_product_rejects_partition() {
        let storage = OrderStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage);

        let action = create_place_action(vec![cart_line("ghost", 10.00, 1)]);
        let result = action.execute(&mut ctx);

        assert!(matches!(result, Err(OrderError::ProductNotFound(id)) if id == "ghost"));
    }

    #[test]
    fn test_marks_idempotency_key() {
        let storage = OrderStorage::open_in_memory().unwrap();
        storage.set_stock("prod-1", 10).unwrap();

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage);
        create_place_action(vec![cart_line("prod-1", 10.00, 1)])
            .execute(&mut ctx)
            .unwrap();
        txn.commit().unwrap();

        assert_eq!(
            storage
                .processed_order_id(&placement_key("req-1", "seller-a"))
                .unwrap(),
            Some("order-1".to_string())
        );
    }

    #[test]
    fn test_cod_starts_payment_pending() {
        let storage = OrderStorage::open_in_memory().unwrap();
        storage.set_stock("prod-1", 10).unwrap();

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage);

        let mut action = create_place_action(vec![cart_line("prod-1", 10.00, 1)]);
        action.payment_method = PaymentMethod::Cod;
        action.execute(&mut ctx).unwrap();
        txn.commit().unwrap();

        let order = storage.get_order("order-1").unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn test_card_starts_payment_paid() {
        let storage = OrderStorage::open_in_memory().unwrap();
        storage.set_stock("prod-1", 10).unwrap();

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage);
        create_place_action(vec![cart_line("prod-1", 10.00, 1)])
            .execute(&mut ctx)
            .unwrap();
        txn.commit().unwrap();

        let order = storage.get_order("order-1").unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_discount_flows_into_totals() {
        let storage = OrderStorage::open_in_memory().unwrap();
        storage.set_stock("prod-1", 10).unwrap();

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage);

        let mut action = create_place_action(vec![cart_line("prod-1", 30.00, 2)]);
        action.discount_amount = 10.00;
        action.execute(&mut ctx).unwrap();
        txn.commit().unwrap();

        let order = storage.get_order("order-1").unwrap().unwrap();
        // 60.00 over the threshold: free delivery; service 2% = 1.20
        assert_eq!(order.subtotal, 60.00);
        assert_eq!(order.delivery_fee, 0.00);
        assert_eq!(order.service_fee, 1.20);
        assert_eq!(order.discount_amount, 10.00);
        assert_eq!(order.total, 51.20);
    }

    #[test]
    fn test_failed_line_leaves_no_partial_decrement_after_abort() {
        let storage = OrderStorage::open_in_memory().unwrap();
        storage.set_stock("prod-1", 10).unwrap();
        storage.set_stock("prod-2", 1).unwrap();

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage);

        let mut second = cart_line("prod-2", 5.00, 3);
        second.seller_id = "seller-a".to_string();
        let action =
            create_place_action(vec![cart_line("prod-1", 10.00, 2), second]);
        assert!(action.execute(&mut ctx).is_err());
        drop(txn); // abort

        // prod-1 was decremented inside the txn but the abort discarded it
        assert_eq!(storage.stock_level("prod-1").unwrap(), Some(10));
        assert_eq!(storage.stock_level("prod-2").unwrap(), Some(1));
    }
}
