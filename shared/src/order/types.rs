//! Shared types for order placement - carts, orders, status machine,
//! placement request and report
//!
//! Status strings and error codes are wire-level contracts: they are stored
//! verbatim and consumed by the storefront, vendor dashboard and
//! notification relay.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

// ============================================================================
// Order Status
// ============================================================================

/// Order lifecycle status
///
/// Serialized as the exact lowercase strings `pending`, `processing`,
/// `shipped`, `delivered`, `cancelled`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed, payment confirmed, not yet picked by the seller
    #[default]
    Pending,
    /// Seller is preparing the shipment
    Processing,
    /// Handed to the carrier
    Shipped,
    /// Received by the customer (terminal)
    Delivered,
    /// Cancelled with stock returned (terminal)
    Cancelled,
}

impl OrderStatus {
    /// Transition table:
    ///
    /// | From | To |
    /// |------|----|
    /// | `pending` | `processing`, `cancelled` |
    /// | `processing` | `shipped`, `cancelled` |
    /// | `shipped` | `delivered`, `cancelled` |
    /// | `delivered` | - |
    /// | `cancelled` | - |
    ///
    /// Anything not listed (including self-transitions) is invalid.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (*self, next),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
                | (Shipped, Cancelled)
        )
    }

    /// Terminal statuses admit no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Payment
// ============================================================================

/// Supported payment methods
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Paypal,
    /// Cash on delivery - settled at the door, order starts unpaid
    Cod,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::Cod => "cod",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" => Ok(PaymentMethod::Card),
            "paypal" => Ok(PaymentMethod::Paypal),
            "cod" => Ok(PaymentMethod::Cod),
            other => Err(format!("unsupported payment method: {other}")),
        }
    }
}

/// Settlement state of an order's payment
///
/// Confirmation itself happens upstream; the core only records the state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    /// Set when a paid order is cancelled; the refund runs externally
    Refunded,
}

// ============================================================================
// Address
// ============================================================================

/// Shipping address, frozen onto the order at placement
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Address {
    #[validate(length(min = 1, message = "street is required"))]
    pub street: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "state is required"))]
    pub state: String,
    #[validate(length(min = 1, message = "zip is required"))]
    pub zip: String,
    #[validate(length(min = 1, message = "country is required"))]
    pub country: String,
}

// ============================================================================
// Cart and Order Lines
// ============================================================================

/// A storefront cart line - the input to placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    /// Product ID
    pub product_id: String,
    /// Product name at the time the line was added
    pub name: String,
    /// Unit price at the time the line was added
    pub unit_price: f64,
    /// Quantity ordered
    pub quantity: u32,
    /// Seller offering the product
    pub seller_id: String,
    /// Stock level last observed by the storefront. Audit only; the
    /// ledger re-checks live stock inside the placement transaction.
    pub stock_on_hand: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
}

/// A line frozen onto an order - later catalog edits never alter it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    pub product_id: String,
    pub name: String,
    pub unit_price: f64,
    pub quantity: u32,
    /// unit_price * quantity, rounded to cents
    pub line_total: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
}

// ============================================================================
// Order
// ============================================================================

/// A placed order - exactly one seller, immutable except for status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order ID (uuid)
    pub id: String,
    /// Globally unique, monotonically increasing number, e.g. `ORD-2024-0001`
    pub order_number: String,
    pub customer_id: String,
    pub seller_id: String,
    /// Frozen line copies
    pub lines: Vec<OrderLine>,
    /// Sum of line totals, rounded to cents
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub service_fee: f64,
    pub discount_amount: f64,
    /// subtotal + delivery_fee + service_fee - discount_amount,
    /// fixed at placement and never recomputed
    pub total: f64,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    /// Frozen address copy
    pub address: Address,
    /// Recorded when the order is cancelled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    /// Unix milliseconds
    pub created_at: i64,
    /// Unix milliseconds, touched on every status change
    pub updated_at: i64,
    /// created_at plus the configured fulfilment lead time (unix millis)
    pub estimated_delivery: i64,
}

// ============================================================================
// Placement Request / Report
// ============================================================================

/// Placement request - one cart, possibly spanning several sellers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    /// Client-generated idempotency key. A retried request returns the
    /// already-created orders instead of placing twice.
    pub request_id: String,
    pub customer_id: String,
    pub lines: Vec<CartLine>,
    pub address: Address,
    /// Wire-level method string, validated against the supported set
    pub payment_method: String,
    /// Per-seller discounts computed upstream (coupon engine output)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub seller_discounts: HashMap<String, f64>,
}

impl PlaceOrderRequest {
    pub fn new(
        customer_id: impl Into<String>,
        lines: Vec<CartLine>,
        address: Address,
        payment_method: impl Into<String>,
    ) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            customer_id: customer_id.into(),
            lines,
            address,
            payment_method: payment_method.into(),
            seller_discounts: HashMap::new(),
        }
    }

    pub fn with_discount(mut self, seller_id: impl Into<String>, amount: f64) -> Self {
        self.seller_discounts.insert(seller_id.into(), amount);
        self
    }
}

/// Wire-level error codes for failed partitions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlacementErrorCode {
    InsufficientStock,
    ProductNotFound,
    ServiceUnavailable,
    InternalError,
}

impl std::fmt::Display for PlacementErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlacementErrorCode::InsufficientStock => write!(f, "INSUFFICIENT_STOCK"),
            PlacementErrorCode::ProductNotFound => write!(f, "PRODUCT_NOT_FOUND"),
            PlacementErrorCode::ServiceUnavailable => write!(f, "SERVICE_UNAVAILABLE"),
            PlacementErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

/// Outcome of one failed seller partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionFailure {
    pub seller_id: String,
    pub code: PlacementErrorCode,
    pub message: String,
}

/// Result of placing a multi-seller cart
///
/// Partitions succeed or fail independently: `orders` holds every order
/// that committed, `failures` the sellers that did not. A client retry of
/// the whole request is safe; committed partitions come back unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementReport {
    pub request_id: String,
    pub orders: Vec<Order>,
    pub failures: Vec<PartitionFailure>,
}

impl PlacementReport {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            orders: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Every partition committed
    pub fn all_placed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Some partitions committed and some failed
    pub fn is_partial(&self) -> bool {
        !self.orders.is_empty() && !self.failures.is_empty()
    }
}

// ============================================================================
// Money Views
// ============================================================================

/// Money split computed at placement, all values rounded to cents
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub service_fee: f64,
    pub discount_amount: f64,
    pub total: f64,
}

/// Three-way settlement view derived from an order, never persisted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PaymentBreakdown {
    /// What the customer paid (the order total)
    pub customer_paid: f64,
    /// What the seller receives after the processing fee
    pub seller_payout: f64,
    /// Service fee plus the vendor processing fee
    pub platform_revenue: f64,
}
