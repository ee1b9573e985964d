//! Versioned worklist snapshots
//!
//! A producer publishes the current trending list under a fresh version and
//! advances the latest pointer; the harvester loads whatever is newest.

pub mod loader;
pub mod memory;
pub mod redis_store;
pub mod trending;
pub mod types;

pub use loader::{PollPolicy, load_latest};
pub use memory::MemorySnapshotStore;
pub use redis_store::{RedisSnapshotStore, SnapshotKeys};
pub use trending::parse_trending_list;
pub use types::{Snapshot, SnapshotError, SnapshotSource, SnapshotStore, TokenDescriptor};
