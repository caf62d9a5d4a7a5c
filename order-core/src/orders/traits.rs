//! Command processing traits and the action-layer error type

use crate::orders::storage::{OrderStorage, StorageError};
use redb::WriteTransaction;
use shared::order::{Order, OrderEvent, OrderStatus};
use thiserror::Error;

/// Errors raised while executing a command
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: u32,
        available: u32,
    },

    #[error("Order {0} is in terminal status {1}")]
    TerminalState(String, OrderStatus),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl OrderError {
    /// Transient failures are worth retrying; domain rejections never are
    pub fn is_transient(&self) -> bool {
        matches!(self, OrderError::Storage(e) if e.is_transient())
    }
}

/// Execution context for command handlers
///
/// Wraps the live write transaction and the storage handle. Everything a
/// handler touches through the context commits or aborts as one unit.
pub struct CommandContext<'a> {
    txn: &'a WriteTransaction,
    storage: &'a OrderStorage,
}

impl<'a> CommandContext<'a> {
    pub fn new(txn: &'a WriteTransaction, storage: &'a OrderStorage) -> Self {
        Self { txn, storage }
    }

    /// Load an order within the transaction
    pub fn load_order(&self, order_id: &str) -> Result<Order, OrderError> {
        self.storage
            .get_order_txn(self.txn, order_id)?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }

    /// Persist an order within the transaction
    pub fn save_order(&mut self, order: &Order) -> Result<(), OrderError> {
        self.storage.store_order(self.txn, order)?;
        Ok(())
    }

    /// Current stock count for a product
    pub fn stock_level(&self, product_id: &str) -> Result<u32, OrderError> {
        self.storage
            .stock_level_txn(self.txn, product_id)?
            .ok_or_else(|| OrderError::ProductNotFound(product_id.to_string()))
    }

    /// Overwrite the stock count for a product
    pub fn put_stock(&mut self, product_id: &str, count: u32) -> Result<(), OrderError> {
        self.storage.put_stock_txn(self.txn, product_id, count)?;
        Ok(())
    }

    /// Record a processed placement partition
    pub fn mark_request_processed(&mut self, key: &str, order_id: &str) -> Result<(), OrderError> {
        self.storage
            .mark_request_processed(self.txn, key, order_id)?;
        Ok(())
    }
}

/// Command handler interface - one implementation per state change
pub trait CommandHandler {
    /// Execute against the open transaction, returning the events to
    /// broadcast once the transaction commits
    fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<Vec<OrderEvent>, OrderError>;
}
