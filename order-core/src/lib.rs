//! Marketplace order placement and fulfillment core
//!
//! # 模块结构
//!
//! ```text
//! order-core/src/
//! ├── core/          # 配置
//! ├── orders/        # 下单、库存、状态机
//! └── utils/         # 日志工具
//! ```
//!
//! The engine takes a multi-seller cart, splits it into per-seller orders,
//! assigns each a monotonically increasing order number, computes the
//! customer/seller/platform money split, reserves stock atomically with
//! order creation and drives each order through its status lifecycle.
//! Rendering, authentication and payment capture live in collaborator
//! processes; this crate owns correctness.

pub mod core;
pub mod orders;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, FeeConfig};
pub use orders::{OrderStorage, OrdersManager};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
