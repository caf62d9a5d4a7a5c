//! Core configuration

pub mod config;

pub use config::{Config, FeeConfig};
