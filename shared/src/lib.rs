//! Shared types for the marketplace order core
//!
//! Common types used across the engine and collaborator processes:
//! cart and order models, the order status machine, placement
//! request/report structures and collaborator events.

pub mod order;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Order model re-exports (for convenient access)
pub use order::{Order, OrderStatus, PlaceOrderRequest, PlacementReport};
