use std::sync::Arc;
use std::time::Duration;

use trending_harvest::dedup::{EventGate, GateError, MemoryDedupGate};

const TTL: Duration = Duration::from_secs(600);

#[tokio::test(start_paused = true)]
async fn test_admits_once_per_window_then_again_after_expiry() -> Result<(), GateError> {
    let gate = MemoryDedupGate::new(TTL);

    assert!(gate.admit("evt-1").await?);
    assert!(!gate.admit("evt-1").await?);

    tokio::time::advance(TTL - Duration::from_secs(1)).await;
    assert!(!gate.admit("evt-1").await?, "still inside the window");

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(gate.admit("evt-1").await?, "window elapsed");
    assert!(!gate.admit("evt-1").await?, "a fresh window started");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_ids_are_independent() -> Result<(), GateError> {
    let gate = MemoryDedupGate::new(TTL);
    assert!(gate.admit("evt-1").await?);
    assert!(gate.admit("evt-2").await?);
    assert_eq!(gate.len(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_evict_expired_removes_only_elapsed_entries() {
    let gate = MemoryDedupGate::new(TTL);
    assert!(gate.admit_now("old"));

    tokio::time::advance(Duration::from_secs(400)).await;
    assert!(gate.admit_now("recent"));

    tokio::time::advance(Duration::from_secs(201)).await;
    assert_eq!(gate.evict_expired(), 1);
    assert_eq!(gate.len(), 1);
    assert!(!gate.admit_now("recent"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_admits_let_exactly_one_through() {
    let gate = Arc::new(MemoryDedupGate::new(TTL));

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.admit("evt-shared").await })
        })
        .collect();

    let mut admitted = 0;
    for handle in handles {
        if matches!(handle.await, Ok(Ok(true))) {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 1);
}

#[tokio::test(start_paused = true)]
async fn test_admissions_sweep_elapsed_entries_without_manual_eviction() {
    let gate = MemoryDedupGate::new(TTL).with_sweep_interval(8);
    for i in 0..10 {
        assert!(gate.admit_now(&format!("stale-{i}")));
    }
    assert_eq!(gate.len(), 10);

    tokio::time::advance(TTL + Duration::from_secs(1)).await;
    for i in 0..8 {
        assert!(gate.admit_now(&format!("fresh-{i}")));
    }

    // The sweep on the 16th admission dropped every stale id
    assert_eq!(gate.len(), 8);
    assert!(!gate.admit_now("fresh-0"));
}
