//! redb-based storage layer for orders, stock and counters
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` (JSON) | Placed orders |
//! | `stock` | `product_id` | `u32` | Live stock counts (non-negative by type) |
//! | `sequence_counter` | `"order_number"` | `u64` | 全局订单序号，重启后继续递增 |
//! | `processed_requests` | `request_id:seller_id` | `order_id` | Placement idempotency |
//!
//! # Atomicity
//!
//! One placement partition commits its order row, its stock decrements and
//! the idempotency mark in a single write transaction. redb serializes
//! write transactions, so counter increments and partition commits are
//! linearized; an aborted transaction leaves no partial state.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::order::Order;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for placed orders: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Table for stock counts: key = product_id, value = units on hand
const STOCK_TABLE: TableDefinition<&str, u32> = TableDefinition::new("stock");

/// Table for the order sequence counter: key = "order_number", value = u64
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

/// Table for processed placement partitions: key = request_id:seller_id, value = order_id
const PROCESSED_REQUESTS_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("processed_requests");

const ORDER_NUMBER_KEY: &str = "order_number";

/// Idempotency key for one seller partition of a placement request
pub fn placement_key(request_id: &str, seller_id: &str) -> String {
    format!("{request_id}:{seller_id}")
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Contention-shaped failures that a bounded retry may resolve
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Transaction(_) | StorageError::Commit(_))
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Order storage backed by redb
#[derive(Clone)]
pub struct OrderStorage {
    db: Arc<Database>,
}

impl OrderStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate`: once `commit()` returns
    /// the data survives power loss, and the file is always left in a
    /// consistent state (copy-on-write with atomic pointer swap).
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            // Create all tables if they don't exist
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(STOCK_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_REQUESTS_TABLE)?;

            // Initialize sequence counter if not exists
            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(ORDER_NUMBER_KEY)?.is_none() {
                seq_table.insert(ORDER_NUMBER_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction (serialized by redb; blocks while another
    /// writer is live)
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Orders ==========

    /// Store an order within a transaction
    pub fn store_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get an order within a transaction (sees uncommitted writes)
    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get an order from committed state
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All committed orders
    pub fn get_all_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        let mut orders = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            orders.push(serde_json::from_slice(value.value())?);
        }
        Ok(orders)
    }

    // ========== Stock ==========

    /// Stock count within a transaction
    pub fn stock_level_txn(
        &self,
        txn: &WriteTransaction,
        product_id: &str,
    ) -> StorageResult<Option<u32>> {
        let table = txn.open_table(STOCK_TABLE)?;
        Ok(table.get(product_id)?.map(|v| v.value()))
    }

    /// Overwrite a stock count within a transaction
    pub fn put_stock_txn(
        &self,
        txn: &WriteTransaction,
        product_id: &str,
        count: u32,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(STOCK_TABLE)?;
        table.insert(product_id, count)?;
        Ok(())
    }

    /// Overwrite a stock count in its own transaction (catalog sync seam)
    pub fn set_stock(&self, product_id: &str, count: u32) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(STOCK_TABLE)?;
            table.insert(product_id, count)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Committed stock count
    pub fn stock_level(&self, product_id: &str) -> StorageResult<Option<u32>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STOCK_TABLE)?;
        Ok(table.get(product_id)?.map(|v| v.value()))
    }

    // ========== Sequence ==========

    /// Atomically increment and return the order sequence
    ///
    /// Runs in its own write transaction; callers allocate before opening
    /// the placement transaction (redb 不支持嵌套写事务). A number whose
    /// placement later aborts is simply burned, keeping the survivors
    /// strictly increasing.
    pub fn next_order_sequence(&self) -> StorageResult<u64> {
        let write_txn = self.db.begin_write()?;
        let next = {
            let mut table = write_txn.open_table(SEQUENCE_TABLE)?;
            let current = table.get(ORDER_NUMBER_KEY)?.map(|v| v.value()).unwrap_or(0);
            let next = current + 1;
            table.insert(ORDER_NUMBER_KEY, next)?;
            next
        };
        write_txn.commit()?;
        Ok(next)
    }

    /// Last allocated sequence value
    pub fn current_order_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table.get(ORDER_NUMBER_KEY)?.map(|v| v.value()).unwrap_or(0))
    }

    // ========== Placement Idempotency ==========

    /// Order created by an already-processed partition, within a transaction
    pub fn processed_order_id_txn(
        &self,
        txn: &WriteTransaction,
        key: &str,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(PROCESSED_REQUESTS_TABLE)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    /// Order created by an already-processed partition, committed state
    pub fn processed_order_id(&self, key: &str) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_REQUESTS_TABLE)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    /// Mark a placement partition processed within the same transaction
    /// that stores its order
    pub fn mark_request_processed(
        &self,
        txn: &WriteTransaction,
        key: &str,
        order_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_REQUESTS_TABLE)?;
        table.insert(key, order_id)?;
        Ok(())
    }
}
