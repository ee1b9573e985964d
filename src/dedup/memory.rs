use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;
use tracing::debug;

use super::{EventGate, GateError};
use crate::utils::constants::DEDUPE_SWEEP_INTERVAL;

/// In-process gate keyed by event id with per-entry expiry.
///
/// The shard lock held by `entry` makes test-and-insert atomic across
/// concurrent callers. Every `sweep_interval` admissions the gate drops
/// entries whose window has elapsed, so ids never seen again do not pile up.
#[derive(Debug)]
pub struct MemoryDedupGate {
    ttl: Duration,
    seen: DashMap<String, Instant>,
    sweep_interval: u64,
    admissions: AtomicU64,
}

impl MemoryDedupGate {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            seen: DashMap::new(),
            sweep_interval: DEDUPE_SWEEP_INTERVAL,
            admissions: AtomicU64::new(0),
        }
    }

    /// Sweep expired entries every `interval` admissions (minimum 1).
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: u64) -> Self {
        self.sweep_interval = interval.max(1);
        self
    }

    /// Admit `event_id` if it has not been seen within the TTL window.
    pub fn admit_now(&self, event_id: &str) -> bool {
        let now = Instant::now();
        let admitted = match self.seen.entry(event_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() > now {
                    false
                } else {
                    entry.insert(now + self.ttl);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now + self.ttl);
                true
            }
        };

        // The entry guard is released above; `retain` takes every shard lock
        let count = self.admissions.fetch_add(1, Ordering::Relaxed) + 1;
        if count % self.sweep_interval == 0 {
            let evicted = self.evict_expired();
            if evicted > 0 {
                debug!(evicted, "Swept expired dedup entries");
            }
        }

        admitted
    }

    /// Remove entries whose window has elapsed. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.seen.len();
        self.seen.retain(|_, expires_at| *expires_at > now);
        before.saturating_sub(self.seen.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[async_trait]
impl EventGate for MemoryDedupGate {
    async fn admit(&self, event_id: &str) -> Result<bool, GateError> {
        Ok(self.admit_now(event_id))
    }
}
