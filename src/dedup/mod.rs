//! Dedup gate for change events
//!
//! `admit(event_id)` returns true once per id within a TTL window. The gate
//! is advisory: an id re-observed after its window has elapsed is admitted
//! again and legitimately reprocessed.

pub mod memory;
pub mod redis_gate;

use async_trait::async_trait;

pub use memory::MemoryDedupGate;
pub use redis_gate::RedisDedupGate;

/// Error types for gate operations
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Dedup backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for GateError {
    fn from(err: redis::RedisError) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Atomic test-and-insert over a time-bounded set of event ids.
#[async_trait]
pub trait EventGate: Send + Sync {
    async fn admit(&self, event_id: &str) -> Result<bool, GateError>;
}
