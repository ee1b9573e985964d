//! Bridges the change-event stream into the worker pool's queue

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::shutdown::ShutdownSignal;
use crate::dedup::EventGate;
use crate::events::ChangeEvent;
use crate::snapshot::TokenDescriptor;

/// Counters for one feeder run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub admitted: usize,
    pub duplicates: usize,
}

/// Pass each event through `gate` and queue admitted tokens on `sender`.
///
/// Runs until the stream ends, the queue closes or `shutdown` is requested.
/// A gate backend error admits the event. Dropping `sender` on return lets
/// the pool drain.
pub async fn admit_events<S>(
    events: S,
    gate: &dyn EventGate,
    sender: mpsc::Sender<TokenDescriptor>,
    shutdown: ShutdownSignal,
) -> FeedStats
where
    S: Stream<Item = ChangeEvent>,
{
    let mut stats = FeedStats::default();
    futures::pin_mut!(events);

    loop {
        let event = tokio::select! {
            event = events.next() => event,
            () = shutdown.requested() => None,
        };
        let Some(event) = event else {
            break;
        };

        let admitted = match gate.admit(&event.event_id).await {
            Ok(admitted) => admitted,
            Err(e) => {
                warn!(event_id = %event.event_id, "Dedup gate unavailable, admitting: {e}");
                true
            }
        };

        if !admitted {
            debug!(event_id = %event.event_id, token = %event.token_address, "Duplicate event suppressed");
            stats.duplicates += 1;
            continue;
        }

        debug!(event_id = %event.event_id, token = %event.token_address, "Event admitted");
        if sender
            .send(TokenDescriptor::bare(event.token_address))
            .await
            .is_err()
        {
            warn!("Worker queue closed; stopping event feed");
            break;
        }
        stats.admitted += 1;
    }

    info!(
        admitted = stats.admitted,
        duplicates = stats.duplicates,
        "Event feed stopped"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::MemoryDedupGate;
    use std::time::Duration;

    fn event(token: &str, id: &str) -> ChangeEvent {
        ChangeEvent {
            token_address: token.into(),
            event_id: id.into(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_event_ids_are_suppressed() {
        let gate = MemoryDedupGate::new(Duration::from_secs(600));
        let (sender, mut receiver) = mpsc::channel(8);
        let events = futures::stream::iter(vec![
            event("MintA", "evt-1"),
            event("MintA", "evt-1"),
            event("MintB", "evt-2"),
        ]);

        let stats = admit_events(events, &gate, sender, ShutdownSignal::new()).await;
        assert_eq!(stats, FeedStats { admitted: 2, duplicates: 1 });

        let mut queued = Vec::new();
        while let Some(descriptor) = receiver.recv().await {
            queued.push(descriptor.address);
        }
        assert_eq!(queued, vec!["MintA", "MintB"]);
    }

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let gate = MemoryDedupGate::new(Duration::from_secs(600));
        let (sender, _receiver) = mpsc::channel(8);
        let shutdown = ShutdownSignal::new();
        shutdown.request();

        let stats = admit_events(futures::stream::pending(), &gate, sender, shutdown).await;
        assert_eq!(stats, FeedStats::default());
    }
}
