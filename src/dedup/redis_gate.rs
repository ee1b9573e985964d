use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::{EventGate, GateError};
use crate::utils::constants::PROCESSED_EVENT_PREFIX;

/// Gate backed by `SET key 1 NX EX ttl` in the coordination store.
///
/// Redis expires the key itself, so there is nothing to evict locally.
#[derive(Clone)]
pub struct RedisDedupGate {
    conn: ConnectionManager,
    ttl: Duration,
    prefix: String,
}

impl RedisDedupGate {
    pub fn new(conn: ConnectionManager, ttl: Duration) -> Self {
        Self {
            conn,
            ttl,
            prefix: PROCESSED_EVENT_PREFIX.to_string(),
        }
    }

    pub async fn connect(redis_url: &str, ttl: Duration) -> Result<Self, GateError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn, ttl))
    }

    #[must_use]
    pub fn key_for(&self, event_id: &str) -> String {
        format!("{}:{event_id}", self.prefix)
    }
}

#[async_trait]
impl EventGate for RedisDedupGate {
    async fn admit(&self, event_id: &str) -> Result<bool, GateError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(self.key_for(event_id))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }
}
