//! OrdersManager - placement orchestration and lifecycle transitions
//!
//! This module handles:
//! - Request validation and cart partitioning
//! - Per-seller atomic placement (order + stock + idempotency mark)
//! - Status transitions, with stock release on cancellation
//! - Event broadcasting after commit
//!
//! # Placement Flow
//!
//! ```text
//! place_order(request)
//!     ├─ 1. Validate request (lines, address, payment method, discounts)
//!     ├─ 2. Partition cart by seller_id
//!     └─ 3. Per partition, independently:
//!         ├─ a. Idempotency pre-check (request_id:seller_id)
//!         ├─ b. Allocate order number (own transaction)
//!         ├─ c. Begin write transaction, re-check idempotency
//!         ├─ d. Re-check stock, decrement, freeze order, mark processed
//!         ├─ e. Commit
//!         └─ f. Broadcast events / record failure in the report
//! ```

mod error;
pub use error::*;

use super::actions::{CommandAction, PlacePartitionAction, UpdateStatusAction};
use super::money;
use super::partition::partition_by_seller;
use super::sequence::OrderNumberAllocator;
use super::storage::{OrderStorage, StorageError, placement_key};
use super::traits::{CommandContext, CommandHandler, OrderError};
use crate::core::config::Config;
use shared::order::{
    CartLine, EventPayload, Order, OrderEvent, OrderStatus, PartitionFailure, PaymentBreakdown,
    PaymentMethod, PlaceOrderRequest, PlacementReport,
};
use std::path::Path;
use tokio::sync::broadcast;
use validator::Validate;

/// Event broadcast channel capacity (支持高并发: 10000订单 × 4事件)
const EVENT_CHANNEL_CAPACITY: usize = 65536;

/// Write attempts per partition before the failure lands in the report
const MAX_TXN_ATTEMPTS: u32 = 3;

/// OrdersManager for placement and lifecycle processing
pub struct OrdersManager {
    storage: OrderStorage,
    allocator: OrderNumberAllocator,
    event_tx: broadcast::Sender<OrderEvent>,
    config: Config,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("storage", &"<OrderStorage>")
            .field("event_tx", &"<broadcast::Sender>")
            .field("config", &self.config)
            .finish()
    }
}

/// What happened to one seller partition
enum PartitionOutcome {
    Placed {
        order: Order,
        events: Vec<OrderEvent>,
    },
    /// The idempotency key was already marked; no new order, no events
    AlreadyPlaced { order: Order },
}

impl OrdersManager {
    /// Create a new OrdersManager with the given database path
    pub fn new(db_path: impl AsRef<Path>, config: Config) -> ManagerResult<Self> {
        let storage = OrderStorage::open(db_path)?;
        Ok(Self::with_parts(storage, config))
    }

    /// Create an OrdersManager with existing storage (for testing)
    #[cfg(test)]
    pub fn with_storage(storage: OrderStorage) -> Self {
        Self::with_parts(storage, Config::default())
    }

    fn with_parts(storage: OrderStorage, config: Config) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let allocator =
            OrderNumberAllocator::new(storage.clone(), config.order_number_prefix.as_str());
        Self {
            storage,
            allocator,
            event_tx,
            config,
        }
    }

    /// Subscribe to event broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.event_tx.subscribe()
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &OrderStorage {
        &self.storage
    }

    /// Get the active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // ========== Placement ==========

    /// Place a multi-seller cart
    ///
    /// The cart splits by seller and each partition commits (or fails) on
    /// its own; one seller running dry never rolls back the others. The
    /// report lists every committed order and every failed seller.
    ///
    /// Request-level problems (empty cart, bad address, unknown payment
    /// method, malformed lines or discounts) fail the whole call before
    /// any partition is attempted.
    pub fn place_order(&self, request: &PlaceOrderRequest) -> ManagerResult<PlacementReport> {
        let payment_method = self.validate_request(request)?;
        let partitions = partition_by_seller(&request.lines);

        // A seller discount larger than that partition's goods is a bad request
        for (seller_id, lines) in &partitions {
            let discount = request
                .seller_discounts
                .get(seller_id)
                .copied()
                .unwrap_or(0.0);
            if money::to_decimal(discount) > money::line_subtotal(lines) {
                return Err(ManagerError::Validation(format!(
                    "discount {discount} for seller {seller_id} exceeds the partition subtotal"
                )));
            }
        }

        let mut report = PlacementReport::new(request.request_id.clone());

        for (seller_id, lines) in partitions {
            let discount = request
                .seller_discounts
                .get(&seller_id)
                .copied()
                .unwrap_or(0.0);

            match self.place_partition(request, &seller_id, &lines, payment_method, discount) {
                Ok(PartitionOutcome::Placed { order, events }) => {
                    tracing::info!(
                        order_id = %order.id,
                        order_number = %order.order_number,
                        seller_id = %seller_id,
                        total = order.total,
                        "Order placed"
                    );
                    self.broadcast(events);
                    report.orders.push(order);
                }
                Ok(PartitionOutcome::AlreadyPlaced { order }) => {
                    tracing::info!(
                        order_id = %order.id,
                        seller_id = %seller_id,
                        request_id = %request.request_id,
                        "Partition already placed, returning existing order"
                    );
                    report.orders.push(order);
                }
                Err(err) => {
                    tracing::warn!(
                        seller_id = %seller_id,
                        error = %err,
                        "Partition placement failed"
                    );
                    report.failures.push(PartitionFailure {
                        seller_id,
                        code: error::classify_placement_error(&err),
                        message: err.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    fn place_partition(
        &self,
        request: &PlaceOrderRequest,
        seller_id: &str,
        lines: &[CartLine],
        payment_method: PaymentMethod,
        discount_amount: f64,
    ) -> Result<PartitionOutcome, OrderError> {
        let key = placement_key(&request.request_id, seller_id);

        // Idempotency pre-check, before a number is allocated
        if let Some(order_id) = self.storage.processed_order_id(&key)? {
            let order = self
                .storage
                .get_order(&order_id)?
                .ok_or(OrderError::OrderNotFound(order_id))?;
            return Ok(PartitionOutcome::AlreadyPlaced { order });
        }

        // Allocate outside the placement transaction (redb 不支持嵌套写事务)
        let order_number = self.allocator.next()?;
        let action = PlacePartitionAction {
            request_id: request.request_id.clone(),
            customer_id: request.customer_id.clone(),
            seller_id: seller_id.to_string(),
            lines: lines.to_vec(),
            address: request.address.clone(),
            payment_method,
            discount_amount,
            order_id: uuid::Uuid::new_v4().to_string(),
            order_number,
            fees: self.config.fees.clone(),
            delivery_lead_days: self.config.delivery_lead_days,
        };

        let mut attempt = 1;
        loop {
            match self.run_partition_txn(&action, &key) {
                Ok(outcome) => return Ok(outcome),
                Err(err) if err.is_transient() && attempt < MAX_TXN_ATTEMPTS => {
                    tracing::warn!(
                        seller_id,
                        attempt,
                        error = %err,
                        "Transient failure placing partition, retrying"
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn run_partition_txn(
        &self,
        action: &PlacePartitionAction,
        key: &str,
    ) -> Result<PartitionOutcome, OrderError> {
        let txn = self.storage.begin_write()?;

        // Double-check idempotency within the transaction
        if let Some(order_id) = self.storage.processed_order_id_txn(&txn, key)? {
            let order = self
                .storage
                .get_order_txn(&txn, &order_id)?
                .ok_or(OrderError::OrderNotFound(order_id))?;
            return Ok(PartitionOutcome::AlreadyPlaced { order });
        }

        let mut ctx = CommandContext::new(&txn, &self.storage);
        let events = action.execute(&mut ctx)?;
        txn.commit().map_err(StorageError::from)?;

        let order = events
            .iter()
            .find_map(|event| match &event.payload {
                EventPayload::OrderCreated { order } => Some(order.clone()),
                _ => None,
            })
            .ok_or_else(|| {
                OrderError::InvalidOperation(
                    "placement produced no OrderCreated event".to_string(),
                )
            })?;

        Ok(PartitionOutcome::Placed { order, events })
    }

    fn validate_request(&self, request: &PlaceOrderRequest) -> ManagerResult<PaymentMethod> {
        if request.request_id.trim().is_empty() {
            return Err(ManagerError::Validation(
                "request_id must not be empty".to_string(),
            ));
        }
        if request.customer_id.trim().is_empty() {
            return Err(ManagerError::Validation(
                "customer_id must not be empty".to_string(),
            ));
        }
        if request.lines.is_empty() {
            return Err(ManagerError::Validation("cart has no lines".to_string()));
        }
        request
            .address
            .validate()
            .map_err(|e| ManagerError::Validation(format!("invalid address: {e}")))?;

        let payment_method = request
            .payment_method
            .parse::<PaymentMethod>()
            .map_err(ManagerError::Validation)?;

        for line in &request.lines {
            money::validate_cart_line(line).map_err(ManagerError::from)?;
        }
        for (seller_id, amount) in &request.seller_discounts {
            money::validate_discount(*amount)
                .map_err(|e| ManagerError::Validation(format!("seller {seller_id}: {e}")))?;
        }

        Ok(payment_method)
    }

    // ========== Lifecycle ==========

    /// Move an order to a new status
    pub fn set_status(&self, order_id: &str, new_status: OrderStatus) -> ManagerResult<Order> {
        self.apply_transition(UpdateStatusAction {
            order_id: order_id.to_string(),
            new_status,
            reason: None,
        })
    }

    /// Cancel an order, releasing its stock
    ///
    /// Valid from any non-terminal status. A paid order is flagged
    /// refunded; the actual refund runs outside this crate.
    pub fn cancel_order(&self, order_id: &str, reason: Option<String>) -> ManagerResult<Order> {
        self.apply_transition(UpdateStatusAction {
            order_id: order_id.to_string(),
            new_status: OrderStatus::Cancelled,
            reason,
        })
    }

    /// Run one transition in a single write transaction
    ///
    /// No retry loop here: redb serializes writers by blocking, so a
    /// transition never observes a conflict it could retry around.
    fn apply_transition(&self, action: UpdateStatusAction) -> ManagerResult<Order> {
        let order_id = action.order_id.clone();

        let txn = self.storage.begin_write()?;
        let mut ctx = CommandContext::new(&txn, &self.storage);
        let events = CommandAction::UpdateStatus(action).execute(&mut ctx)?;
        txn.commit().map_err(StorageError::from)?;

        let order = self
            .storage
            .get_order(&order_id)?
            .ok_or(ManagerError::OrderNotFound(order_id))?;

        tracing::info!(
            order_id = %order.id,
            status = %order.status,
            "Order status updated"
        );
        self.broadcast(events);
        Ok(order)
    }

    // ========== Reads ==========

    /// Get a committed order
    pub fn get_order(&self, order_id: &str) -> ManagerResult<Order> {
        self.storage
            .get_order(order_id)?
            .ok_or_else(|| ManagerError::OrderNotFound(order_id.to_string()))
    }

    /// All orders belonging to a customer, newest first
    pub fn orders_for_customer(&self, customer_id: &str) -> ManagerResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .storage
            .get_all_orders()?
            .into_iter()
            .filter(|o| o.customer_id == customer_id)
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// All orders belonging to a seller, newest first
    pub fn orders_for_seller(&self, seller_id: &str) -> ManagerResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .storage
            .get_all_orders()?
            .into_iter()
            .filter(|o| o.seller_id == seller_id)
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Settlement view of a committed order
    ///
    /// The service fee comes frozen off the order; only the vendor share
    /// is derived from the current fee configuration.
    pub fn payment_breakdown(&self, order_id: &str) -> ManagerResult<PaymentBreakdown> {
        let order = self.get_order(order_id)?;
        Ok(money::payment_breakdown(&order, &self.config.fees))
    }

    // ========== Stock ==========

    /// Overwrite a product's stock count (catalog sync seam)
    pub fn set_stock(&self, product_id: &str, count: u32) -> ManagerResult<()> {
        self.storage.set_stock(product_id, count)?;
        Ok(())
    }

    /// Committed stock count for a product
    pub fn stock_level(&self, product_id: &str) -> ManagerResult<Option<u32>> {
        Ok(self.storage.stock_level(product_id)?)
    }

    /// Broadcast events after a successful commit
    fn broadcast(&self, events: Vec<OrderEvent>) {
        for event in events {
            if self.event_tx.send(event).is_err() {
                tracing::warn!("Event broadcast failed: no active receivers");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests;
