use crate::config::ConfigError;
use crate::dedup::GateError;
use crate::events::EventFeedError;
use crate::extraction::{PoolReport, StageFailure};
use crate::snapshot::SnapshotError;
use crate::store::PersistenceError;

/// Errors that end a pipeline run rather than a single item.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Events(#[from] EventFeedError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("Failed to open store: {0}")]
    Store(#[from] PersistenceError),

    #[error("Browser setup failed: {0}")]
    Browser(String),

    /// Storage became unreachable mid-run. Holds every outcome recorded
    /// before the pool stopped.
    #[error("Storage connection lost: {reason}")]
    StorageConnectionLost { reason: String, report: PoolReport },

    #[error("Trending capture failed: {0}")]
    Capture(StageFailure),

    #[error("Trending capture parsed no tokens")]
    EmptyCapture,
}
