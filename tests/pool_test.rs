mod common;

use std::sync::Arc;

use anyhow::Result;
use common::*;
use tokio::sync::mpsc;
use trending_harvest::extraction::{ItemStatus, StageFailure};
use trending_harvest::harvest_engine::{PipelineError, ShutdownSignal, WorkerPool};
use trending_harvest::snapshot::{
    MemorySnapshotStore, PollPolicy, Snapshot, SnapshotStore, TokenDescriptor,
};
use trending_harvest::sync_once;

fn pool(site: &FakeSite, store: &trending_harvest::TokenStore, workers: usize) -> WorkerPool {
    WorkerPool::new(site.factory(), store.clone(), Arc::new(quick_plan()), workers)
}

fn snapshot(version: u64, addresses: &[&str]) -> Snapshot {
    Snapshot {
        version,
        tokens: addresses.iter().map(|a| TokenDescriptor::bare(*a)).collect(),
    }
}

#[tokio::test]
async fn test_one_failing_item_does_not_stop_the_other() -> Result<()> {
    let (_dir, store) = temp_store().await?;
    let site = FakeSite::new();
    site.page(token_url("MintA"), token_page("Alpha", &["W1"]))
        .page(trader_url("W1"), trader_page("$1K", "50%"))
        // MintB never renders its primary marker
        .page(token_url("MintB"), FakePage::new("<html>spinner</html>"));

    let report = pool(&site, &store, 2)
        .run_snapshot(&snapshot(1, &["MintA", "MintB"]))
        .await?;

    assert_eq!(report.outcomes.len(), 2);
    assert!(report.status_of("MintA").is_some_and(ItemStatus::is_completed));
    assert_eq!(
        report.status_of("MintB").and_then(ItemStatus::failure),
        Some(&StageFailure::PrimaryContentTimeout)
    );
    assert!(store.get_token("MintA").await?.is_some());
    assert!(store.get_token("MintB").await?.is_none());
    assert_eq!(site.acquired(), site.released());
    Ok(())
}

#[tokio::test]
async fn test_end_to_end_snapshot_run_is_idempotent() -> Result<()> {
    let (_dir, store) = temp_store().await?;
    let snapshots = MemorySnapshotStore::new();
    for _ in 0..4 {
        snapshots.publish(&[TokenDescriptor::bare("Stale")]).await?;
    }
    let version = snapshots
        .publish(&[TokenDescriptor::bare("MintA"), TokenDescriptor::bare("MintB")])
        .await?;
    assert_eq!(version, 5);

    let site = FakeSite::new();
    site.page(token_url("MintA"), token_page("Alpha", &["W1", "W2"]))
        .page(trader_url("W1"), trader_page("$1K", "50%"))
        .page(trader_url("W2"), trader_page("$2K", "75%"))
        .page(token_url("MintB"), FakePage::new("<html>spinner</html>"));
    let workers = pool(&site, &store, 2);

    let report = sync_once(&snapshots, &PollPolicy::default(), &workers).await?;
    assert_eq!(report.completed(), 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(
        report.status_of("MintB").map(|s| s.failure().map(ToString::to_string)),
        Some(Some("primary-content-timeout".to_string()))
    );

    assert_eq!(store.token_count().await?, 1);
    assert_eq!(store.trader_count().await?, 2);
    let traders = store.traders_for_token("MintA").await?;
    assert!(traders.iter().all(|t| t.token_address.as_deref() == Some("MintA")));

    let token_before = store.get_token("MintA").await?;
    let second = sync_once(&snapshots, &PollPolicy::default(), &workers).await?;
    assert_eq!(second.completed(), 1);
    assert_eq!(store.token_count().await?, 1);
    assert_eq!(store.trader_count().await?, 2);
    assert_eq!(store.get_token("MintA").await?, token_before);
    Ok(())
}

#[tokio::test]
async fn test_event_pass_keeps_metrics_from_snapshot_pass() -> Result<()> {
    let (_dir, store) = temp_store().await?;
    let site = FakeSite::new();
    site.page(token_url("MintA"), token_page("Alpha", &["W1"]))
        .page(trader_url("W1"), trader_page("$1K", "50%"));
    let workers = pool(&site, &store, 1);

    let mut listed = TokenDescriptor::bare("MintA");
    listed.market_cap = Some(1_200_000.0);
    listed.liquidity = Some(5_000.0);
    listed.volume = Some(9_000.0);
    let report = workers
        .run_snapshot(&Snapshot {
            version: 1,
            tokens: vec![listed],
        })
        .await?;
    assert_eq!(report.completed(), 1);

    let (sender, receiver) = mpsc::channel(1);
    sender.send(TokenDescriptor::bare("MintA")).await?;
    drop(sender);
    let report = workers.run_queue(receiver).await?;
    assert_eq!(report.completed(), 1);

    let stored = store.get_token("MintA").await?;
    assert_eq!(stored.as_ref().and_then(|t| t.name.as_deref()), Some("Alpha"));
    assert_eq!(stored.as_ref().and_then(|t| t.market_cap), Some(1_200_000.0));
    assert_eq!(stored.as_ref().and_then(|t| t.liquidity), Some(5_000.0));
    assert_eq!(stored.and_then(|t| t.volume), Some(9_000.0));
    assert_eq!(store.trader_count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_panicking_item_is_reported_and_pool_survives() -> Result<()> {
    let (_dir, store) = temp_store().await?;
    let site = FakeSite::new();
    site.page(token_url("MintA"), token_page("Alpha", &[]).panicking())
        .page(token_url("MintB"), token_page("Beta", &[]));

    let report = pool(&site, &store, 1)
        .run_snapshot(&snapshot(1, &["MintA", "MintB"]))
        .await?;

    assert_eq!(
        report.status_of("MintA").and_then(ItemStatus::failure),
        Some(&StageFailure::Panicked)
    );
    assert!(report.status_of("MintB").is_some_and(ItemStatus::is_completed));
    Ok(())
}

#[tokio::test]
async fn test_lost_storage_stops_the_pool_with_partial_report() -> Result<()> {
    let (_dir, store) = temp_store().await?;
    let site = FakeSite::new();
    for mint in ["MintA", "MintB", "MintC"] {
        site.page(token_url(mint), token_page(mint, &[]));
    }
    store.close().await;

    let result = pool(&site, &store, 1)
        .run_snapshot(&snapshot(1, &["MintA", "MintB", "MintC"]))
        .await;

    match result {
        Err(PipelineError::StorageConnectionLost { report, .. }) => {
            // The single executor stops after the first fatal item
            assert_eq!(report.outcomes.len(), 1);
            assert!(
                report.outcomes[0]
                    .status
                    .failure()
                    .is_some_and(StageFailure::is_fatal)
            );
        }
        other => panic!("Expected StorageConnectionLost, got: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_shutdown_is_checked_before_each_item() -> Result<()> {
    let (_dir, store) = temp_store().await?;
    let site = FakeSite::new();
    site.page(token_url("MintA"), token_page("Alpha", &[]));

    let shutdown = ShutdownSignal::new();
    shutdown.request();
    let report = pool(&site, &store, 3)
        .with_shutdown(shutdown)
        .run_snapshot(&snapshot(1, &["MintA"]))
        .await?;

    assert!(report.outcomes.is_empty());
    assert_eq!(site.acquired(), 0);
    Ok(())
}

#[tokio::test]
async fn test_queue_mode_drains_until_senders_drop() -> Result<()> {
    let (_dir, store) = temp_store().await?;
    let site = FakeSite::new();
    site.page(token_url("MintA"), token_page("Alpha", &[]))
        .page(token_url("MintB"), token_page("Beta", &[]));

    let (sender, receiver) = mpsc::channel(4);
    let producer = tokio::spawn(async move {
        for mint in ["MintA", "MintB", "MintA"] {
            sender.send(TokenDescriptor::bare(mint)).await?;
        }
        Ok::<_, mpsc::error::SendError<TokenDescriptor>>(())
    });

    let report = pool(&site, &store, 2).run_queue(receiver).await?;
    producer.await??;

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.completed(), 3);
    assert_eq!(store.token_count().await?, 2);
    Ok(())
}

#[tokio::test]
async fn test_publish_trending_creates_a_new_version() -> Result<()> {
    use trending_harvest::harvest_engine::publish_trending;
    use trending_harvest::snapshot::SnapshotSource;

    let mint = "7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr";
    let plan = quick_plan();
    let site = FakeSite::new();
    site.page(
        plan.trending_url.clone(),
        FakePage::new(format!(
            r#"<img class="ds-dex-table-row-token-icon-img" src="https://dd.dexscreener.com/ds-data/tokens/solana/{mint}.png">
               <span class="ds-dex-table-row-base-token-name-text">Popcat</span>"#
        ))
        .visible(TRENDING_ROWS),
    );
    let snapshots = MemorySnapshotStore::new();

    let version = publish_trending(site.factory().as_ref(), &plan, &snapshots).await?;
    assert_eq!(version, 1);
    assert_eq!(snapshots.latest_version().await?, Some(1));
    let tokens = snapshots.read(1).await?.unwrap_or_default();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].address, mint);
    assert_eq!(site.acquired(), site.released());
    Ok(())
}

#[tokio::test]
async fn test_empty_trending_capture_is_not_published() -> Result<()> {
    use trending_harvest::harvest_engine::publish_trending;
    use trending_harvest::snapshot::SnapshotSource;

    let plan = quick_plan();
    let site = FakeSite::new();
    site.page(plan.trending_url.clone(), FakePage::new("<html>challenge</html>"));
    let snapshots = MemorySnapshotStore::new();

    let result = publish_trending(site.factory().as_ref(), &plan, &snapshots).await;
    assert!(matches!(result, Err(PipelineError::EmptyCapture)));
    assert_eq!(snapshots.latest_version().await?, None);
    Ok(())
}
