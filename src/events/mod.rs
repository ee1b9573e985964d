//! Change notifications for single tokens
//!
//! Producers publish `{"token_address": ..., "event_id": ...}` on a pub/sub
//! channel when a token's data changes. Malformed payloads are dropped with a
//! warning; they never reach the dedup gate.

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(alias = "item_id", alias = "address")]
    pub token_address: String,
    pub event_id: String,
}

/// Error types for the change-event feed
#[derive(Debug, thiserror::Error)]
pub enum EventFeedError {
    #[error("Failed to subscribe to channel '{channel}': {source}")]
    Subscribe {
        channel: String,
        #[source]
        source: redis::RedisError,
    },
}

/// Decode a raw payload, rejecting empty identifiers.
pub fn decode_event(payload: &str) -> Option<ChangeEvent> {
    match serde_json::from_str::<ChangeEvent>(payload) {
        Ok(event) if !event.token_address.trim().is_empty() && !event.event_id.is_empty() => {
            Some(event)
        }
        Ok(_) => {
            warn!(payload, "Dropping change event with empty identifiers");
            None
        }
        Err(e) => {
            warn!(payload, error = %e, "Dropping malformed change event");
            None
        }
    }
}

/// Subscribe to `channel` and yield decoded events until the connection ends.
pub async fn subscribe(
    client: &redis::Client,
    channel: &str,
) -> Result<impl Stream<Item = ChangeEvent> + Send + 'static, EventFeedError> {
    let subscribe_error = |source| EventFeedError::Subscribe {
        channel: channel.to_string(),
        source,
    };

    let mut pubsub = client.get_async_pubsub().await.map_err(subscribe_error)?;
    pubsub.subscribe(channel).await.map_err(subscribe_error)?;
    info!(channel, "Subscribed to change events");

    Ok(pubsub.into_on_message().filter_map(|message| async move {
        match message.get_payload::<String>() {
            Ok(payload) => decode_event(&payload),
            Err(e) => {
                warn!(error = %e, "Dropping non-text change event payload");
                None
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid_event() {
        let event = decode_event(r#"{"token_address": "MintA", "event_id": "evt-1"}"#);
        assert_eq!(
            event,
            Some(ChangeEvent {
                token_address: "MintA".into(),
                event_id: "evt-1".into(),
            })
        );
    }

    #[test]
    fn test_decode_accepts_item_id_alias() {
        let event = decode_event(r#"{"item_id": "MintB", "event_id": "evt-2"}"#);
        assert_eq!(event.map(|e| e.token_address), Some("MintB".to_string()));
    }

    #[test]
    fn test_decode_drops_malformed_payloads() {
        assert_eq!(decode_event("not json"), None);
        assert_eq!(decode_event(r#"{"token_address": "MintA"}"#), None);
        assert_eq!(decode_event(r#"{"token_address": "  ", "event_id": "e"}"#), None);
        assert_eq!(decode_event(r#"{"token_address": "MintA", "event_id": ""}"#), None);
    }
}
