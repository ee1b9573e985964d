//! Builder setters
//!
//! Setters never validate; `build()` does.

use super::builder::HarvestConfigBuilder;

impl HarvestConfigBuilder {
    #[must_use]
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = url.into();
        self
    }

    #[must_use]
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Run browsers without a window. Headed mode is for local debugging.
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    #[must_use]
    pub fn snapshot_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.snapshot_prefix = prefix.into();
        self
    }

    /// Poll attempts before the loader reports the snapshot unavailable.
    ///
    /// `0` waits indefinitely. That is an explicit operational choice, not
    /// the default.
    #[must_use]
    pub fn snapshot_poll_attempts(mut self, attempts: u32) -> Self {
        self.snapshot_poll_attempts = attempts;
        self
    }

    #[must_use]
    pub fn snapshot_poll_backoff_ms(mut self, initial: u64, max: u64) -> Self {
        self.snapshot_poll_backoff_ms = initial;
        self.snapshot_poll_max_backoff_ms = max;
        self
    }

    #[must_use]
    pub fn event_channel(mut self, channel: impl Into<String>) -> Self {
        self.event_channel = channel.into();
        self
    }

    #[must_use]
    pub fn dedupe_ttl_secs(mut self, secs: u64) -> Self {
        self.dedupe_ttl_secs = secs;
        self
    }

    #[must_use]
    pub fn trader_link_cap(mut self, cap: usize) -> Self {
        self.trader_link_cap = cap;
        self
    }

    #[must_use]
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = addr.into();
        self
    }

    #[must_use]
    pub fn navigation_timeout_secs(mut self, secs: u64) -> Self {
        self.navigation_timeout_secs = secs;
        self
    }

    /// Wait budgets for the primary, trigger, secondary and detail stages
    #[must_use]
    pub fn stage_timeouts_secs(mut self, primary: u64, trigger: u64, secondary: u64, detail: u64) -> Self {
        self.primary_timeout_secs = primary;
        self.trigger_timeout_secs = trigger;
        self.secondary_timeout_secs = secondary;
        self.detail_timeout_secs = detail;
        self
    }

    #[must_use]
    pub fn settle_secs(mut self, token: u64, trader: u64) -> Self {
        self.token_settle_secs = token;
        self.trader_settle_secs = trader;
        self
    }
}
