//! Getter methods for `HarvestConfig`, plus the derived runtime settings

use std::net::SocketAddr;
use std::time::Duration;

use super::types::HarvestConfig;
use crate::extraction::ExtractionPlan;
use crate::snapshot::PollPolicy;

impl HarvestConfig {
    #[must_use]
    pub fn redis_url(&self) -> &str {
        &self.redis_url
    }

    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn snapshot_prefix(&self) -> &str {
        &self.snapshot_prefix
    }

    #[must_use]
    pub fn event_channel(&self) -> &str {
        &self.event_channel
    }

    #[must_use]
    pub fn dedupe_ttl(&self) -> Duration {
        Duration::from_secs(self.dedupe_ttl_secs)
    }

    #[must_use]
    pub fn trader_link_cap(&self) -> usize {
        self.trader_link_cap
    }

    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    /// Snapshot loader budget. Zero attempts means poll forever.
    #[must_use]
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: (self.snapshot_poll_attempts > 0).then_some(self.snapshot_poll_attempts),
            initial_backoff: Duration::from_millis(self.snapshot_poll_backoff_ms),
            max_backoff: Duration::from_millis(self.snapshot_poll_max_backoff_ms),
        }
    }

    /// Default stage table with this configuration's cap and timings.
    #[must_use]
    pub fn plan(&self) -> ExtractionPlan {
        ExtractionPlan::default()
            .with_link_cap(self.trader_link_cap)
            .with_settle(
                Duration::from_secs(self.token_settle_secs),
                Duration::from_secs(self.trader_settle_secs),
            )
            .with_stage_timeouts(
                Duration::from_secs(self.primary_timeout_secs),
                Duration::from_secs(self.trigger_timeout_secs),
                Duration::from_secs(self.secondary_timeout_secs),
                Duration::from_secs(self.detail_timeout_secs),
            )
    }
}
