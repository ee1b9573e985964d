//! Worker pool, event feeder and trending publisher

pub mod error;
pub mod feeder;
pub mod pool;
pub mod publisher;
pub mod shutdown;

pub use error::PipelineError;
pub use feeder::{FeedStats, admit_events};
pub use pool::WorkerPool;
pub use publisher::{capture_trending, publish_trending};
pub use shutdown::ShutdownSignal;
