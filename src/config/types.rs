//! Core configuration types for the harvester
//!
//! `HarvestConfig` holds every tunable of a deployment: coordination and
//! storage endpoints, pool sizing, snapshot polling, dedup window and the
//! extraction timings.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Main configuration struct for harvest runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestConfig {
    pub(crate) redis_url: String,
    pub(crate) database_url: String,

    /// Number of concurrent executors, never 0
    pub(crate) workers: usize,
    pub(crate) headless: bool,

    pub(crate) snapshot_prefix: String,
    /// 0 polls until a snapshot appears
    pub(crate) snapshot_poll_attempts: u32,
    pub(crate) snapshot_poll_backoff_ms: u64,
    pub(crate) snapshot_poll_max_backoff_ms: u64,

    pub(crate) event_channel: String,
    pub(crate) dedupe_ttl_secs: u64,

    /// Trader profiles visited per token, never 0
    pub(crate) trader_link_cap: usize,
    pub(crate) listen_addr: SocketAddr,

    pub(crate) navigation_timeout_secs: u64,
    pub(crate) primary_timeout_secs: u64,
    pub(crate) trigger_timeout_secs: u64,
    pub(crate) secondary_timeout_secs: u64,
    pub(crate) detail_timeout_secs: u64,
    pub(crate) token_settle_secs: u64,
    pub(crate) trader_settle_secs: u64,
}

/// Rejected configuration values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("workers must be at least 1")]
    ZeroWorkers,

    #[error("trader link cap must be at least 1")]
    ZeroLinkCap,

    #[error("snapshot poll backoff must be non-zero and not exceed its ceiling")]
    InvalidBackoff,

    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}
