//! Engine configuration
//!
//! 所有配置通过环境变量注入：
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `WORK_DIR` | `./data` | Directory holding the order database |
//! | `ORDER_NUMBER_PREFIX` | `ORD` | Prefix for generated order numbers |
//! | `DELIVERY_LEAD_DAYS` | `5` | Estimated fulfilment lead time in days |
//! | `DELIVERY_FEE` | `5.00` | Flat delivery fee below the threshold |
//! | `FREE_SHIPPING_THRESHOLD` | `50.00` | Subtotal at or above which delivery is free |
//! | `SERVICE_FEE_PERCENT` | `2.0` | Customer-side service fee (percent of subtotal) |
//! | `VENDOR_FEE_PERCENT` | `10.0` | Seller-side processing fee (percent of discounted subtotal) |

use std::path::{Path, PathBuf};

/// Fee schedule applied at placement
///
/// Percentages are expressed 0-100. The schedule is read once at startup;
/// orders keep the totals computed with the schedule in force when they
/// were placed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeConfig {
    /// Flat delivery fee charged below the free-shipping threshold
    pub delivery_fee: f64,
    /// Subtotal at or above which delivery is free
    pub free_shipping_threshold: f64,
    /// Customer-side service fee, percent of subtotal
    pub service_fee_percent: f64,
    /// Seller-side processing fee, percent of the discounted subtotal
    pub vendor_fee_percent: f64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            delivery_fee: 5.00,
            free_shipping_threshold: 50.00,
            service_fee_percent: 2.0,
            vendor_fee_percent: 10.0,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the order database
    pub work_dir: String,
    /// Prefix for generated order numbers
    pub order_number_prefix: String,
    /// Estimated fulfilment lead time in days
    pub delivery_lead_days: i64,
    /// Fee schedule
    pub fees: FeeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: "./data".to_string(),
            order_number_prefix: "ORD".to_string(),
            delivery_lead_days: 5,
            fees: FeeConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable
    pub fn from_env() -> Self {
        let defaults = FeeConfig::default();
        let config = Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".to_string()),
            order_number_prefix: std::env::var("ORDER_NUMBER_PREFIX")
                .unwrap_or_else(|_| "ORD".to_string()),
            delivery_lead_days: std::env::var("DELIVERY_LEAD_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            fees: FeeConfig {
                delivery_fee: env_f64("DELIVERY_FEE", defaults.delivery_fee),
                free_shipping_threshold: env_f64(
                    "FREE_SHIPPING_THRESHOLD",
                    defaults.free_shipping_threshold,
                ),
                service_fee_percent: env_f64("SERVICE_FEE_PERCENT", defaults.service_fee_percent),
                vendor_fee_percent: env_f64("VENDOR_FEE_PERCENT", defaults.vendor_fee_percent),
            },
        };
        tracing::debug!(
            work_dir = %config.work_dir,
            prefix = %config.order_number_prefix,
            "Loaded configuration from environment"
        );
        config
    }

    /// Path of the order database file under the work directory
    pub fn db_path(&self) -> PathBuf {
        Path::new(&self.work_dir).join("orders.redb")
    }

    /// Override the fee schedule and lead time
    pub fn with_overrides(mut self, fees: FeeConfig, delivery_lead_days: i64) -> Self {
        self.fees = fees;
        self.delivery_lead_days = delivery_lead_days;
        self
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
