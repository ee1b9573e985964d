//! In-process snapshot store

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::types::{SnapshotError, SnapshotSource, SnapshotStore, TokenDescriptor};

#[derive(Debug, Default)]
struct MemoryState {
    last_assigned: u64,
    latest: Option<u64>,
    windows: BTreeMap<u64, Arc<Vec<TokenDescriptor>>>,
}

/// Snapshot store kept in process memory.
///
/// Used by tests and single-process runs. Versions start at 1.
#[derive(Debug, Default, Clone)]
pub struct MemorySnapshotStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the window stored under `version`, as a TTL expiry would.
    ///
    /// The latest pointer is left untouched.
    pub fn expire(&self, version: u64) -> bool {
        self.state.lock().windows.remove(&version).is_some()
    }
}

#[async_trait]
impl SnapshotSource for MemorySnapshotStore {
    async fn latest_version(&self) -> Result<Option<u64>, SnapshotError> {
        Ok(self.state.lock().latest)
    }

    async fn read(&self, version: u64) -> Result<Option<Vec<TokenDescriptor>>, SnapshotError> {
        Ok(self
            .state
            .lock()
            .windows
            .get(&version)
            .map(|tokens| tokens.as_ref().clone()))
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn publish(&self, tokens: &[TokenDescriptor]) -> Result<u64, SnapshotError> {
        let mut state = self.state.lock();
        let version = state.last_assigned + 1;
        state.last_assigned = version;
        state.windows.insert(version, Arc::new(tokens.to_vec()));
        state.latest = Some(version);
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(ids: &[&str]) -> Vec<TokenDescriptor> {
        ids.iter().map(|id| TokenDescriptor::bare(*id)).collect()
    }

    #[tokio::test]
    async fn test_empty_store_has_no_version() -> Result<(), SnapshotError> {
        let store = MemorySnapshotStore::new();
        assert_eq!(store.latest_version().await?, None);
        assert_eq!(store.read(1).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_publish_is_monotonic_and_reads_are_stable() -> Result<(), SnapshotError> {
        let store = MemorySnapshotStore::new();

        let mut previous = 0;
        for round in 0..5 {
            let id = format!("token-{round}");
            let version = store.publish(&tokens(&[id.as_str()])).await?;
            assert!(version > previous);
            previous = version;
        }

        assert_eq!(store.latest_version().await?, Some(previous));
        assert_eq!(store.read(2).await?, Some(tokens(&["token-1"])));
        assert_eq!(store.read(2).await?, Some(tokens(&["token-1"])));
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_version_is_absent_and_never_reused() -> Result<(), SnapshotError> {
        let store = MemorySnapshotStore::new();
        let first = store.publish(&tokens(&["a"])).await?;
        assert!(store.expire(first));
        assert_eq!(store.read(first).await?, None);

        let second = store.publish(&tokens(&["b"])).await?;
        assert!(second > first);
        Ok(())
    }
}
