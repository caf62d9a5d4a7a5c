//! Order Placement Module
//!
//! This module implements multi-seller order placement and fulfillment:
//!
//! - **manager**: OrdersManager - validation, per-seller placement, status lifecycle
//! - **storage**: redb-based persistence for orders, stock and counters
//! - **money**: fee calculation on rust_decimal
//! - **sequence**: monotonic order number allocation
//! - **partition**: cart grouping by seller
//! - **actions**: one command handler per state change
//!
//! # Placement Flow
//!
//! ```text
//! PlaceOrderRequest → validate → partition by seller
//!     per partition:
//!         ├─ idempotency check (request_id + seller_id)
//!         ├─ allocate order number (own transaction)
//!         ├─ one write transaction: order + stock decrements + idempotency mark
//!         └─ commit → broadcast OrderCreated
//! → PlacementReport (orders + per-seller failures)
//! ```

pub mod actions;
pub mod manager;
pub mod money;
pub mod partition;
pub mod sequence;
pub mod storage;
pub mod traits;

// Re-exports
pub use manager::OrdersManager;
pub use sequence::OrderNumberAllocator;
pub use storage::OrderStorage;

// Re-export shared types for convenience
pub use shared::order::{
    EventPayload, Order, OrderEvent, OrderEventType, OrderStatus, PlaceOrderRequest,
    PlacementErrorCode, PlacementReport,
};
