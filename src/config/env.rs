//! Loading `HarvestConfig` from environment variables
//!
//! Unset variables keep their defaults. Set but unparsable variables are
//! errors rather than silently ignored.

use std::str::FromStr;

use super::builder::HarvestConfigBuilder;
use super::types::{ConfigError, HarvestConfig};

impl HarvestConfig {
    /// Read the process environment, honouring a `.env` file when present.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a variable cannot be parsed or the
    /// assembled configuration fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup, e.g. a map in tests.
    ///
    /// # Errors
    ///
    /// See [`HarvestConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = HarvestConfigBuilder::default();

        if let Some(url) = lookup("REDIS_URL") {
            builder = builder.redis_url(url);
        }
        if let Some(url) = lookup("DATABASE_URL") {
            builder = builder.database_url(url);
        }
        if let Some(workers) = parsed(&lookup, "HARVEST_WORKERS")? {
            builder = builder.workers(workers);
        }
        if let Some(raw) = lookup("HEADLESS") {
            builder = builder.headless(parse_flag("HEADLESS", &raw)?);
        }
        if let Some(prefix) = lookup("SNAPSHOT_PREFIX") {
            builder = builder.snapshot_prefix(prefix);
        }
        if let Some(attempts) = parsed(&lookup, "SNAPSHOT_POLL_ATTEMPTS")? {
            builder = builder.snapshot_poll_attempts(attempts);
        }

        let initial = parsed(&lookup, "SNAPSHOT_POLL_BACKOFF_MS")?;
        let max = parsed(&lookup, "SNAPSHOT_POLL_MAX_BACKOFF_MS")?;
        if initial.is_some() || max.is_some() {
            let initial = initial.unwrap_or(builder.snapshot_poll_backoff_ms);
            let max = max.unwrap_or(builder.snapshot_poll_max_backoff_ms);
            builder = builder.snapshot_poll_backoff_ms(initial, max);
        }

        if let Some(ttl) = parsed(&lookup, "DEDUPE_TTL_SECS")? {
            builder = builder.dedupe_ttl_secs(ttl);
        }
        if let Some(channel) = lookup("EVENT_CHANNEL") {
            builder = builder.event_channel(channel);
        }
        if let Some(cap) = parsed(&lookup, "TRADER_LINK_CAP")? {
            builder = builder.trader_link_cap(cap);
        }
        if let Some(addr) = lookup("LISTEN_ADDR") {
            builder = builder.listen_addr(addr);
        }
        if let Some(secs) = parsed(&lookup, "NAVIGATION_TIMEOUT_SECS")? {
            builder = builder.navigation_timeout_secs(secs);
        }

        builder.build()
    }
}

fn parsed<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::invalid(key, raw.as_str(), e))
        })
        .transpose()
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, raw, "expected 1 or 0")),
    }
}
