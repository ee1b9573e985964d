//! Configuration module for harvest runs
//!
//! This module provides the `HarvestConfig` struct, its fluent builder and
//! environment loading, with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod env;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::HarvestConfigBuilder;
pub use types::{ConfigError, HarvestConfig};
