//! Bounded polling for the latest snapshot
//!
//! The loader waits for a published version, then reads its worklist. Each
//! failed poll (no pointer yet, window missing, backend or decode error) is
//! followed by an exponential backoff sleep with jitter. After the attempt
//! budget is spent it returns [`SnapshotError::Unavailable`].

use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use super::types::{Snapshot, SnapshotError, SnapshotSource};
use crate::utils::constants::{
    DEFAULT_SNAPSHOT_POLL_ATTEMPTS, DEFAULT_SNAPSHOT_POLL_BACKOFF_MS,
    DEFAULT_SNAPSHOT_POLL_MAX_BACKOFF_MS,
};

/// Retry budget for [`load_latest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Attempts before giving up; `None` polls until a snapshot appears
    pub max_attempts: Option<u32>,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(DEFAULT_SNAPSHOT_POLL_ATTEMPTS),
            initial_backoff: Duration::from_millis(DEFAULT_SNAPSHOT_POLL_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_SNAPSHOT_POLL_MAX_BACKOFF_MS),
        }
    }
}

impl PollPolicy {
    /// Delay after the given (1-based) failed attempt, before jitter.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }
}

enum PollMiss {
    NoVersion,
    WindowMissing(u64),
    Failed(SnapshotError),
}

async fn poll_once(source: &dyn SnapshotSource) -> Result<Snapshot, PollMiss> {
    let version = match source.latest_version().await {
        Ok(Some(version)) => version,
        Ok(None) => return Err(PollMiss::NoVersion),
        Err(e) => return Err(PollMiss::Failed(e)),
    };

    match source.read(version).await {
        Ok(Some(tokens)) => Ok(Snapshot { version, tokens }),
        Ok(None) => Err(PollMiss::WindowMissing(version)),
        Err(e) => Err(PollMiss::Failed(e)),
    }
}

/// Wait for the latest snapshot and return it.
pub async fn load_latest(
    source: &dyn SnapshotSource,
    policy: &PollPolicy,
) -> Result<Snapshot, SnapshotError> {
    let mut attempt: u32 = 0;

    loop {
        attempt = attempt.saturating_add(1);

        match poll_once(source).await {
            Ok(snapshot) => {
                info!(
                    version = snapshot.version,
                    tokens = snapshot.tokens.len(),
                    attempt,
                    "Loaded snapshot"
                );
                return Ok(snapshot);
            }
            Err(PollMiss::NoVersion) => debug!(attempt, "No snapshot version published yet"),
            Err(PollMiss::WindowMissing(version)) => {
                warn!(attempt, version, "Latest version points at a missing window");
            }
            Err(PollMiss::Failed(e)) => warn!(attempt, error = %e, "Snapshot poll failed"),
        }

        if policy.max_attempts.is_some_and(|max| attempt >= max) {
            return Err(SnapshotError::Unavailable { attempts: attempt });
        }

        let base = policy.backoff_for(attempt);
        let jitter_ceiling = (base.as_millis() as u64 / 10).max(1);
        let jitter = Duration::from_millis(rand::rng().random_range(0..jitter_ceiling));
        tokio::time::sleep(base + jitter).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = PollPolicy {
            max_attempts: Some(10),
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(1000),
        };

        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(4), Duration::from_millis(800));
        assert_eq!(policy.backoff_for(5), Duration::from_millis(1000));
        assert_eq!(policy.backoff_for(60), Duration::from_millis(1000));
    }
}
