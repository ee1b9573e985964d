//! Redis-backed snapshot store
//!
//! Key layout, for prefix `trending`:
//! - `trending:latest_version` holds the newest published version
//! - `trending:window:{version}` holds the JSON worklist for that version
//! - `trending:version_seq` is the producer's allocation counter
//!
//! Publishing runs as two Lua scripts: one allocates the version, the next
//! writes that window and advances the pointer. Each script declares every
//! key it touches; on Redis Cluster give the prefix a hash tag
//! (`{trending}`) so all of them share a slot.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use tracing::debug;

use super::types::{SnapshotError, SnapshotSource, SnapshotStore, TokenDescriptor};

/// Allocate max(latest, seq) + 1 so versions stay monotonic even when
/// another producer advanced the pointer without touching the counter.
const ALLOCATE_SCRIPT: &str = r"
local latest = tonumber(redis.call('GET', KEYS[1]) or '0') or 0
local seq = tonumber(redis.call('GET', KEYS[2]) or '0') or 0
local version = math.max(latest, seq) + 1
redis.call('SET', KEYS[2], version)
return version
";

/// Write the window, then move the pointer only upward.
const COMMIT_SCRIPT: &str = r"
local version = tonumber(ARGV[3])
local ttl = tonumber(ARGV[2])
if ttl and ttl > 0 then
    redis.call('SET', KEYS[1], ARGV[1], 'EX', ttl)
else
    redis.call('SET', KEYS[1], ARGV[1])
end
local latest = tonumber(redis.call('GET', KEYS[2]) or '0') or 0
if version > latest then
    redis.call('SET', KEYS[2], version)
end
return version
";

/// Snapshot key names derived from a prefix.
#[derive(Debug, Clone)]
pub struct SnapshotKeys {
    prefix: String,
}

impl SnapshotKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn latest(&self) -> String {
        format!("{}:latest_version", self.prefix)
    }

    #[must_use]
    pub fn window(&self, version: u64) -> String {
        format!("{}{version}", self.window_prefix())
    }

    #[must_use]
    pub fn window_prefix(&self) -> String {
        format!("{}:window:", self.prefix)
    }

    #[must_use]
    pub fn sequence(&self) -> String {
        format!("{}:version_seq", self.prefix)
    }
}

#[derive(Clone)]
pub struct RedisSnapshotStore {
    conn: ConnectionManager,
    keys: SnapshotKeys,
    /// Expiry for published windows in seconds; 0 keeps them forever
    window_ttl_secs: u64,
}

impl RedisSnapshotStore {
    /// Connect to the coordination store at `redis_url`.
    pub async fn connect(redis_url: &str, prefix: &str) -> Result<Self, SnapshotError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::with_connection(conn, prefix))
    }

    pub fn with_connection(conn: ConnectionManager, prefix: &str) -> Self {
        Self {
            conn,
            keys: SnapshotKeys::new(prefix),
            window_ttl_secs: 0,
        }
    }

    #[must_use]
    pub fn with_window_ttl(mut self, secs: u64) -> Self {
        self.window_ttl_secs = secs;
        self
    }

    #[must_use]
    pub fn keys(&self) -> &SnapshotKeys {
        &self.keys
    }
}

#[async_trait]
impl SnapshotSource for RedisSnapshotStore {
    async fn latest_version(&self) -> Result<Option<u64>, SnapshotError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(self.keys.latest()).await?;

        raw.map(|value| {
            value.trim().parse::<u64>().map_err(|e| {
                SnapshotError::Decode(format!("latest_version {value:?} is not a version: {e}"))
            })
        })
        .transpose()
    }

    async fn read(&self, version: u64) -> Result<Option<Vec<TokenDescriptor>>, SnapshotError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(self.keys.window(version)).await?;

        match raw {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SnapshotStore for RedisSnapshotStore {
    async fn publish(&self, tokens: &[TokenDescriptor]) -> Result<u64, SnapshotError> {
        let payload = serde_json::to_string(tokens)?;
        let mut conn = self.conn.clone();

        let version: u64 = Script::new(ALLOCATE_SCRIPT)
            .key(self.keys.latest())
            .key(self.keys.sequence())
            .invoke_async(&mut conn)
            .await?;

        // An allocated version whose commit fails is never reused
        let _: u64 = Script::new(COMMIT_SCRIPT)
            .key(self.keys.window(version))
            .key(self.keys.latest())
            .arg(payload)
            .arg(self.window_ttl_secs)
            .arg(version)
            .invoke_async(&mut conn)
            .await?;

        debug!(version, tokens = tokens.len(), "Published snapshot");
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let keys = SnapshotKeys::new("trending");
        assert_eq!(keys.latest(), "trending:latest_version");
        assert_eq!(keys.window(5), "trending:window:5");
        assert_eq!(keys.sequence(), "trending:version_seq");
    }

    /// Runs against a live server when `REDIS_TEST_URL` is set.
    #[tokio::test]
    async fn test_publish_against_live_redis() -> Result<(), SnapshotError> {
        let Ok(url) = std::env::var("REDIS_TEST_URL") else {
            return Ok(());
        };
        let prefix = format!("{{harvest-test-{}}}", uuid::Uuid::new_v4());
        let store = RedisSnapshotStore::connect(&url, &prefix).await?;

        assert_eq!(store.latest_version().await?, None);
        let first = store.publish(&[TokenDescriptor::bare("MintA")]).await?;
        let second = store.publish(&[TokenDescriptor::bare("MintB")]).await?;

        assert!(second > first);
        assert_eq!(store.latest_version().await?, Some(second));
        let tokens = store.read(second).await?.unwrap_or_default();
        assert_eq!(tokens, vec![TokenDescriptor::bare("MintB")]);
        Ok(())
    }
}
