//! Shared configuration constants for the harvester
//!
//! Default values used by the config layer, the extraction plan and the
//! coordination store, kept in one place to avoid magic numbers.

/// Default number of concurrent executors: 5
///
/// Each executor owns one browser session at a time, so this is also the
/// upper bound on concurrently open pages.
pub const DEFAULT_WORKERS: usize = 5;

/// Maximum number of trader profiles visited per token
pub const DEFAULT_TRADER_LINK_CAP: usize = 10;

/// Key prefix for snapshot keys in the coordination store
///
/// Produces `trending:latest_version` and `trending:window:{version}`.
pub const DEFAULT_SNAPSHOT_PREFIX: &str = "trending";

/// Channel carrying change notifications
pub const DEFAULT_EVENT_CHANNEL: &str = "token_changed";

/// Key prefix for processed event identifiers
pub const PROCESSED_EVENT_PREFIX: &str = "processed_event_ids";

/// Dedup window for change events: 10 minutes
pub const DEFAULT_DEDUPE_TTL_SECS: u64 = 600;

/// Admissions between expiry sweeps of the in-memory dedup gate
pub const DEDUPE_SWEEP_INTERVAL: u64 = 1024;

/// Poll attempts before the snapshot loader gives up (0 = unbounded)
pub const DEFAULT_SNAPSHOT_POLL_ATTEMPTS: u32 = 30;

/// First delay between snapshot polls, doubled after each miss
pub const DEFAULT_SNAPSHOT_POLL_BACKOFF_MS: u64 = 500;

/// Ceiling for the snapshot poll delay
pub const DEFAULT_SNAPSHOT_POLL_MAX_BACKOFF_MS: u64 = 10_000;

/// Token page: primary content must render within 100 seconds
pub const PRIMARY_CONTENT_TIMEOUT_SECS: u64 = 100;

/// Token page: the reveal trigger must appear within 10 seconds
pub const REVEAL_TRIGGER_TIMEOUT_SECS: u64 = 10;

/// Token page: trader links must render within 100 seconds of the reveal
pub const SECONDARY_CONTENT_TIMEOUT_SECS: u64 = 100;

/// Trader page: detail content must render within 50 seconds
pub const DETAIL_CONTENT_TIMEOUT_SECS: u64 = 50;

/// Pause after loading a token page before challenge handling
pub const TOKEN_SETTLE_SECS: u64 = 5;

/// Pause after loading a trader page before challenge handling
pub const TRADER_SETTLE_SECS: u64 = 2;

/// Navigation (`page.goto`) timeout for browser sessions
pub const NAVIGATION_TIMEOUT_SECS: u64 = 60;

/// Interval between visibility probes while waiting on a selector
pub const VISIBILITY_POLL_INTERVAL_MS: u64 = 250;

/// Default lookup endpoint bind address
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5000";

/// Default coordination store URL
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379/0";

/// Default durable store URL
pub const DEFAULT_DATABASE_URL: &str = "sqlite://trending_harvest.sqlite";

/// Chrome user agent string for stealth mode
///
/// Chrome releases new stable versions ~every 4 weeks.
/// Update quarterly to stay within reasonable version window.
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
