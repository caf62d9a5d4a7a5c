//! Order events - immutable facts broadcast after commit

use super::types::{Order, OrderStatus};
use serde::{Deserialize, Serialize};

/// Order event - notification record for collaborators
///
/// Events are sent only after the owning transaction commits; an event is
/// never observed for state that did not persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Event unique ID
    pub event_id: String,
    /// Order this event belongs to
    pub order_id: String,
    /// Server timestamp (Unix milliseconds)
    pub timestamp: i64,
    /// Event type
    pub event_type: OrderEventType,
    /// Event payload
    pub payload: EventPayload,
}

impl OrderEvent {
    pub fn new(order_id: String, event_type: OrderEventType, payload: EventPayload) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            order_id,
            timestamp: crate::util::now_millis(),
            event_type,
            payload,
        }
    }
}

/// Event type enumeration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEventType {
    /// A new order committed (one per seller partition)
    OrderCreated,
    /// An order moved through the status machine
    OrderStatusChanged,
    /// Cancellation returned stock to a product
    StockReleased,
}

impl std::fmt::Display for OrderEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderEventType::OrderCreated => write!(f, "ORDER_CREATED"),
            OrderEventType::OrderStatusChanged => write!(f, "ORDER_STATUS_CHANGED"),
            OrderEventType::StockReleased => write!(f, "STOCK_RELEASED"),
        }
    }
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    OrderCreated {
        /// Complete snapshot of the created order
        order: Order,
    },

    OrderStatusChanged {
        from: OrderStatus,
        to: OrderStatus,
        /// Cancellation reason, when the destination is `cancelled`
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    StockReleased {
        product_id: String,
        /// Total released for this product across the order's lines
        quantity: u32,
    },
}
