pub mod browser_pool;
pub mod browser_profile;
pub mod browser_setup;
pub mod capability;
pub mod config;
pub mod dedup;
pub mod events;
pub mod extraction;
pub mod field_normalizer;
pub mod harvest_engine;
pub mod lookup_api;
pub mod snapshot;
pub mod store;
pub mod utils;

pub use browser_pool::{BrowserPool, BrowserPoolConfig};
pub use browser_setup::{
    apply_stealth_measures, download_managed_browser, find_browser_executable, launch_browser,
};
pub use capability::{BrowserSession, ChromeSessionFactory, ClickTarget, SessionFactory};
pub use config::{ConfigError, HarvestConfig};
pub use dedup::{EventGate, GateError, MemoryDedupGate, RedisDedupGate};
pub use events::{ChangeEvent, EventFeedError};
pub use extraction::{ExtractionPlan, ItemOutcome, ItemStatus, PoolReport, StageFailure};
pub use field_normalizer::{normalize, normalize_count};
pub use harvest_engine::{PipelineError, ShutdownSignal, WorkerPool};
pub use lookup_api::{LookupState, TokenSummary};
pub use snapshot::{
    MemorySnapshotStore, PollPolicy, RedisSnapshotStore, Snapshot, SnapshotError, SnapshotSource,
    SnapshotStore, TokenDescriptor, load_latest,
};
pub use store::{PersistenceError, TokenRecord, TokenStore, TraderMetrics, TraderRecord};

/// Load the latest snapshot and run it through the pool once.
///
/// Per-item failures land in the returned report; only an unavailable
/// snapshot or a lost storage connection is an error.
pub async fn sync_once(
    source: &dyn SnapshotSource,
    policy: &PollPolicy,
    pool: &WorkerPool,
) -> Result<PoolReport, PipelineError> {
    let snapshot = load_latest(source, policy).await?;
    pool.run_snapshot(&snapshot).await
}
