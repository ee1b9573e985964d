//! One trending-list capture published as a new snapshot version

use tracing::info;

use super::error::PipelineError;
use crate::capability::SessionFactory;
use crate::extraction::{ExtractionPlan, StageFailure, harvest_trending};
use crate::snapshot::{SnapshotStore, TokenDescriptor};

/// Capture the trending page once. The session is released on every path.
pub async fn capture_trending(
    factory: &dyn SessionFactory,
    plan: &ExtractionPlan,
) -> Result<Vec<TokenDescriptor>, PipelineError> {
    let mut session = factory
        .acquire()
        .await
        .map_err(|e| PipelineError::Capture(StageFailure::Session(format!("{e:#}"))))?;

    let captured = harvest_trending(session.as_mut(), plan).await;
    session.release().await;

    captured.map_err(PipelineError::Capture)
}

/// Capture the trending page and publish it. Returns the new version.
///
/// An empty capture is not published so consumers keep the last good list.
pub async fn publish_trending(
    factory: &dyn SessionFactory,
    plan: &ExtractionPlan,
    store: &dyn SnapshotStore,
) -> Result<u64, PipelineError> {
    let tokens = capture_trending(factory, plan).await?;
    if tokens.is_empty() {
        return Err(PipelineError::EmptyCapture);
    }

    let version = store.publish(&tokens).await?;
    info!(version, tokens = tokens.len(), "Published trending snapshot");
    Ok(version)
}
