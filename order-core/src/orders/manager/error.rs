use super::super::storage::StorageError;
use super::super::traits::OrderError;
use shared::order::{OrderStatus, PlacementErrorCode};
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Order {order_id} is in terminal status {status}")]
    TerminalState {
        order_id: String,
        status: OrderStatus,
    },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<OrderError> for ManagerError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::OrderNotFound(id) => ManagerError::OrderNotFound(id),
            OrderError::ProductNotFound(id) => ManagerError::ProductNotFound(id),
            OrderError::TerminalState(order_id, status) => {
                ManagerError::TerminalState { order_id, status }
            }
            OrderError::InvalidTransition { from, to } => {
                ManagerError::InvalidTransition { from, to }
            }
            OrderError::InsufficientStock {
                product_id,
                requested,
                available,
            } => ManagerError::Validation(format!(
                "Insufficient stock for {product_id}: requested {requested}, available {available}"
            )),
            OrderError::InvalidOperation(msg) => ManagerError::Validation(msg),
            OrderError::Storage(e) => ManagerError::Storage(e),
        }
    }
}

/// Map a partition failure onto its wire code (客户端按错误码本地化)
pub(crate) fn classify_placement_error(err: &OrderError) -> PlacementErrorCode {
    match err {
        OrderError::InsufficientStock { .. } => PlacementErrorCode::InsufficientStock,
        OrderError::ProductNotFound(_) => PlacementErrorCode::ProductNotFound,
        OrderError::Storage(e) if e.is_transient() => PlacementErrorCode::ServiceUnavailable,
        _ => PlacementErrorCode::InternalError,
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
