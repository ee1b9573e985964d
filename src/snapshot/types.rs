//! Snapshot data types and the store contracts

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::field_normalizer::normalize;

/// One worklist entry as published by the producer.
///
/// Only `address` is required. Metrics may arrive as numbers or as display
/// strings (`"$1.2M"`); both forms are normalized on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenDescriptor {
    #[serde(alias = "contract", alias = "item_id", alias = "id")]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_metric", skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(default, deserialize_with = "lenient_metric", skip_serializing_if = "Option::is_none")]
    pub liquidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_metric", skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl TokenDescriptor {
    /// Descriptor carrying only an address, as admitted from a change event.
    pub fn bare(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
            market_cap: None,
            liquidity: None,
            volume: None,
        }
    }
}

fn lenient_metric<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => normalize(&text),
        _ => None,
    })
}

/// An immutable, versioned worklist.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub version: u64,
    pub tokens: Vec<TokenDescriptor>,
}

/// Error types for snapshot operations
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// No readable version appeared within the loader's poll budget
    #[error("Snapshot unavailable after {attempts} poll attempts")]
    Unavailable { attempts: u32 },

    /// The coordination store could not be reached or rejected a command
    #[error("Snapshot backend error: {0}")]
    Backend(String),

    /// A stored pointer or window could not be decoded
    #[error("Snapshot decode error: {0}")]
    Decode(String),
}

impl From<redis::RedisError> for SnapshotError {
    fn from(err: redis::RedisError) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Read side of a snapshot store.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Current value of the latest-version pointer, if any version exists.
    async fn latest_version(&self) -> Result<Option<u64>, SnapshotError>;

    /// Worklist stored under `version`; `None` if not yet published or expired.
    async fn read(&self, version: u64) -> Result<Option<Vec<TokenDescriptor>>, SnapshotError>;
}

/// Producer side of a snapshot store.
///
/// `publish` assigns a version strictly greater than every version assigned
/// before it, stores the worklist under that version and advances the
/// latest pointer, atomically.
#[async_trait]
pub trait SnapshotStore: SnapshotSource {
    async fn publish(&self, tokens: &[TokenDescriptor]) -> Result<u64, SnapshotError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_accepts_producer_aliases() -> Result<(), serde_json::Error> {
        let tokens: Vec<TokenDescriptor> = serde_json::from_str(
            r#"[
                {"contract": "So1anaMintAAA", "name": "Alpha", "market_cap": "$1.2M", "liquidity": 5000, "volume": null},
                {"address": "So1anaMintBBB"}
            ]"#,
        )?;

        assert_eq!(tokens[0].address, "So1anaMintAAA");
        assert_eq!(tokens[0].name.as_deref(), Some("Alpha"));
        assert_eq!(tokens[0].market_cap, Some(1_200_000.0));
        assert_eq!(tokens[0].liquidity, Some(5000.0));
        assert_eq!(tokens[0].volume, None);
        assert_eq!(tokens[1], TokenDescriptor::bare("So1anaMintBBB"));
        Ok(())
    }

    #[test]
    fn test_unparsable_metric_becomes_null() -> Result<(), serde_json::Error> {
        let token: TokenDescriptor =
            serde_json::from_str(r#"{"address": "X", "market_cap": "n/a", "volume": true}"#)?;
        assert_eq!(token.market_cap, None);
        assert_eq!(token.volume, None);
        Ok(())
    }

    #[test]
    fn test_descriptor_requires_address() {
        let result = serde_json::from_str::<TokenDescriptor>(r#"{"name": "Nameless"}"#);
        assert!(result.is_err());
    }
}
