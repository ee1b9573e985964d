//! Fluent builder for `HarvestConfig`
//!
//! Every field has a default, so `HarvestConfig::builder().build()` yields a
//! usable local configuration. Values are validated once, at `build()`.

use std::net::SocketAddr;

use url::Url;

use super::types::{ConfigError, HarvestConfig};
use crate::utils::constants::{
    DEFAULT_DATABASE_URL, DEFAULT_DEDUPE_TTL_SECS, DEFAULT_EVENT_CHANNEL, DEFAULT_LISTEN_ADDR,
    DEFAULT_REDIS_URL, DEFAULT_SNAPSHOT_POLL_ATTEMPTS, DEFAULT_SNAPSHOT_POLL_BACKOFF_MS,
    DEFAULT_SNAPSHOT_POLL_MAX_BACKOFF_MS, DEFAULT_SNAPSHOT_PREFIX, DEFAULT_TRADER_LINK_CAP,
    DEFAULT_WORKERS, DETAIL_CONTENT_TIMEOUT_SECS, NAVIGATION_TIMEOUT_SECS,
    PRIMARY_CONTENT_TIMEOUT_SECS, REVEAL_TRIGGER_TIMEOUT_SECS, SECONDARY_CONTENT_TIMEOUT_SECS,
    TOKEN_SETTLE_SECS, TRADER_SETTLE_SECS,
};

#[derive(Debug, Clone)]
pub struct HarvestConfigBuilder {
    pub(crate) redis_url: String,
    pub(crate) database_url: String,
    pub(crate) workers: usize,
    pub(crate) headless: bool,
    pub(crate) snapshot_prefix: String,
    pub(crate) snapshot_poll_attempts: u32,
    pub(crate) snapshot_poll_backoff_ms: u64,
    pub(crate) snapshot_poll_max_backoff_ms: u64,
    pub(crate) event_channel: String,
    pub(crate) dedupe_ttl_secs: u64,
    pub(crate) trader_link_cap: usize,
    pub(crate) listen_addr: String,
    pub(crate) navigation_timeout_secs: u64,
    pub(crate) primary_timeout_secs: u64,
    pub(crate) trigger_timeout_secs: u64,
    pub(crate) secondary_timeout_secs: u64,
    pub(crate) detail_timeout_secs: u64,
    pub(crate) token_settle_secs: u64,
    pub(crate) trader_settle_secs: u64,
}

impl Default for HarvestConfigBuilder {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            workers: DEFAULT_WORKERS,
            headless: true,
            snapshot_prefix: DEFAULT_SNAPSHOT_PREFIX.to_string(),
            snapshot_poll_attempts: DEFAULT_SNAPSHOT_POLL_ATTEMPTS,
            snapshot_poll_backoff_ms: DEFAULT_SNAPSHOT_POLL_BACKOFF_MS,
            snapshot_poll_max_backoff_ms: DEFAULT_SNAPSHOT_POLL_MAX_BACKOFF_MS,
            event_channel: DEFAULT_EVENT_CHANNEL.to_string(),
            dedupe_ttl_secs: DEFAULT_DEDUPE_TTL_SECS,
            trader_link_cap: DEFAULT_TRADER_LINK_CAP,
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            navigation_timeout_secs: NAVIGATION_TIMEOUT_SECS,
            primary_timeout_secs: PRIMARY_CONTENT_TIMEOUT_SECS,
            trigger_timeout_secs: REVEAL_TRIGGER_TIMEOUT_SECS,
            secondary_timeout_secs: SECONDARY_CONTENT_TIMEOUT_SECS,
            detail_timeout_secs: DETAIL_CONTENT_TIMEOUT_SECS,
            token_settle_secs: TOKEN_SETTLE_SECS,
            trader_settle_secs: TRADER_SETTLE_SECS,
        }
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        HarvestConfigBuilder::default().assemble(SocketAddr::from(([0, 0, 0, 0], 5000)))
    }
}

impl HarvestConfig {
    /// Create a builder for configuring a `HarvestConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> HarvestConfigBuilder {
        HarvestConfigBuilder::default()
    }
}

impl HarvestConfigBuilder {
    /// Validate and assemble the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for zero workers or link cap, an unusable
    /// backoff, a malformed Redis URL, a non-SQLite database URL or an
    /// unparsable listen address.
    pub fn build(self) -> Result<HarvestConfig, ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.trader_link_cap == 0 {
            return Err(ConfigError::ZeroLinkCap);
        }
        if self.snapshot_poll_backoff_ms == 0
            || self.snapshot_poll_backoff_ms > self.snapshot_poll_max_backoff_ms
        {
            return Err(ConfigError::InvalidBackoff);
        }

        let redis = Url::parse(&self.redis_url)
            .map_err(|e| ConfigError::invalid("REDIS_URL", &self.redis_url, e))?;
        if !matches!(redis.scheme(), "redis" | "rediss") {
            return Err(ConfigError::invalid(
                "REDIS_URL",
                &self.redis_url,
                "expected redis:// or rediss://",
            ));
        }

        if !self.database_url.starts_with("sqlite:") {
            return Err(ConfigError::invalid(
                "DATABASE_URL",
                &self.database_url,
                "expected a sqlite: URL",
            ));
        }

        let listen_addr: SocketAddr = self
            .listen_addr
            .parse()
            .map_err(|e| ConfigError::invalid("LISTEN_ADDR", &self.listen_addr, e))?;

        if self.snapshot_prefix.is_empty() {
            return Err(ConfigError::invalid(
                "SNAPSHOT_PREFIX",
                "",
                "prefix must not be empty",
            ));
        }

        Ok(self.assemble(listen_addr))
    }

    fn assemble(self, listen_addr: SocketAddr) -> HarvestConfig {
        HarvestConfig {
            redis_url: self.redis_url,
            database_url: self.database_url,
            workers: self.workers,
            headless: self.headless,
            snapshot_prefix: self.snapshot_prefix,
            snapshot_poll_attempts: self.snapshot_poll_attempts,
            snapshot_poll_backoff_ms: self.snapshot_poll_backoff_ms,
            snapshot_poll_max_backoff_ms: self.snapshot_poll_max_backoff_ms,
            event_channel: self.event_channel,
            dedupe_ttl_secs: self.dedupe_ttl_secs,
            trader_link_cap: self.trader_link_cap,
            listen_addr,
            navigation_timeout_secs: self.navigation_timeout_secs,
            primary_timeout_secs: self.primary_timeout_secs,
            trigger_timeout_secs: self.trigger_timeout_secs,
            secondary_timeout_secs: self.secondary_timeout_secs,
            detail_timeout_secs: self.detail_timeout_secs,
            token_settle_secs: self.token_settle_secs,
            trader_settle_secs: self.trader_settle_secs,
        }
    }
}
