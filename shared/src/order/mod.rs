//! Order Placement Module
//!
//! This module provides the types for the order placement core:
//! - Types: carts, orders, the status machine, placement request/report
//! - Events: immutable facts broadcast after each committed change

pub mod event;
pub mod types;

// Re-exports
pub use event::{EventPayload, OrderEvent, OrderEventType};
pub use types::*;
