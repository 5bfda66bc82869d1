//! Integration tests for the load-decide-append loop
//!
//! Every test runs the real stack: `TransactionalStream` over
//! `InterleavingStore` over `FoldingStore` over `InMemoryEventStore`, so
//! conflicts are produced by genuine version checks, not by stubs.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use composable_stream_core::accumulator::{FoldFn, evolve};
use composable_stream_core::codec::{Codec, JsonCodec};
use composable_stream_core::event::Event;
use composable_stream_core::event_store::{EventStore, EventStoreError};
use composable_stream_core::stream::StreamId;
use composable_stream_core::stream_store::StreamStore;
use composable_stream_runtime::{FoldingStore, StreamConfig, StreamError, TransactionalStream};
use composable_stream_testing::{InMemoryEventStore, InterleavingStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum CounterEvent {
    Added { amount: i64 },
}

impl Event for CounterEvent {
    fn event_type(&self) -> &'static str {
        "Added.v1"
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
#[error("counter limit {limit} reached")]
struct LimitReached {
    limit: i64,
}

const fn added(amount: i64) -> CounterEvent {
    CounterEvent::Added { amount }
}

fn counter_fold() -> FoldFn<i64, CounterEvent> {
    evolve(|total: i64, event: &CounterEvent| match event {
        CounterEvent::Added { amount } => total + amount,
    })
}

fn stream_id() -> StreamId {
    StreamId::new("counter-1")
}

struct Harness {
    events: InMemoryEventStore,
    store: Arc<InterleavingStore<CounterEvent, i64>>,
    stream: TransactionalStream<CounterEvent, i64>,
}

impl Harness {
    fn new(max_attempts: u32) -> Self {
        let events = InMemoryEventStore::new();
        let folding = FoldingStore::new(
            Arc::new(events.clone()) as Arc<dyn EventStore>,
            JsonCodec,
            0_i64,
            counter_fold(),
        );
        let store = Arc::new(InterleavingStore::new(
            Arc::new(folding) as Arc<dyn StreamStore<CounterEvent, i64>>
        ));
        let stream = TransactionalStream::new(
            Arc::clone(&store) as Arc<dyn StreamStore<CounterEvent, i64>>,
            stream_id(),
            counter_fold(),
        )
        .with_config(StreamConfig::default().with_max_attempts(max_attempts));

        Self {
            events,
            store,
            stream,
        }
    }

    /// Write events straight into the byte store, bypassing the counters.
    async fn seed(&self, amounts: &[i64]) {
        let encoded = amounts
            .iter()
            .map(|amount| JsonCodec.encode(&added(*amount)).unwrap())
            .collect();
        self.events
            .append_events(stream_id(), None, encoded)
            .await
            .unwrap();
    }

    /// Amounts as stored, decoded, in append order.
    fn stored_amounts(&self) -> Vec<i64> {
        self.events
            .events(&stream_id())
            .iter()
            .map(|stored| {
                let event: CounterEvent = JsonCodec.decode(stored).unwrap();
                let CounterEvent::Added { amount } = event;
                amount
            })
            .collect()
    }
}

// ============================================================================
// Transact
// ============================================================================

#[tokio::test]
async fn transact_appends_proposed_events_in_order() {
    let h = Harness::new(3);

    h.stream.transact(|_| [added(2), added(3)]).await.unwrap();

    assert_eq!(h.stored_amounts(), vec![2, 3]);
    assert_eq!(h.store.loads(), 1);
    assert_eq!(h.store.append_attempts(), 1);
}

#[tokio::test]
async fn empty_decision_succeeds_without_writing() {
    let h = Harness::new(3);
    h.seed(&[4]).await;

    h.stream
        .transact(|total| if *total > 10 { vec![added(1)] } else { vec![] })
        .await
        .unwrap();

    assert_eq!(h.store.append_attempts(), 0);
    assert_eq!(h.events.write_count(), 1); // the seed only
    assert_eq!(h.stored_amounts(), vec![4]);
}

#[tokio::test]
async fn empty_decision_ignores_pending_rival() {
    let h = Harness::new(3);
    h.store.interleave(vec![added(5)]);

    h.stream.transact(|_| Vec::new()).await.unwrap();

    // No append was attempted, so the rival never got a chance to land.
    assert_eq!(h.store.pending_rivals(), 1);
    assert!(h.stored_amounts().is_empty());
}

// ============================================================================
// Retry on conflict
// ============================================================================

#[tokio::test]
async fn counter_scenario_commits_once_against_reloaded_state() {
    let h = Harness::new(3);
    h.store.interleave(vec![added(5)]);

    h.stream.transact(|_| [added(1)]).await.unwrap();

    assert_eq!(h.stored_amounts(), vec![5, 1]);
    assert_eq!(h.store.committed(), vec![vec![added(1)]]);
    assert_eq!(h.stream.query(|total| *total).await.unwrap(), 6);
}

#[tokio::test]
async fn only_the_final_attempts_events_are_committed() {
    let h = Harness::new(3);
    h.seed(&[1]).await;
    h.store.interleave(vec![added(5)]).interleave(vec![added(7)]);
    let mut observed = Vec::new();

    // Doubles the counter: the proposal depends on the state it saw.
    h.stream
        .transact(|total| {
            observed.push(*total);
            [added(*total)]
        })
        .await
        .unwrap();

    assert_eq!(observed, vec![1, 6, 13]);
    assert_eq!(h.store.committed(), vec![vec![added(13)]]);
    assert_eq!(h.stored_amounts(), vec![1, 5, 7, 13]);
    assert_eq!(h.store.loads(), 3);
    assert_eq!(h.store.append_attempts(), 3);
}

#[tokio::test]
async fn three_conflicts_exhaust_default_attempts() {
    let h = Harness::new(3);
    for rival in [10, 20, 30] {
        h.store.interleave(vec![added(rival)]);
    }

    let error = h.stream.transact(|_| [added(1)]).await.unwrap_err();

    match error {
        StreamError::AttemptsExhausted {
            stream_id: id,
            attempts,
        } => {
            assert_eq!(id, stream_id());
            assert_eq!(attempts, 3);
        }
        other => panic!("expected AttemptsExhausted, got {other:?}"),
    }
    assert!(h.store.committed().is_empty());
    assert_eq!(h.stored_amounts(), vec![10, 20, 30]);
    assert_eq!(h.store.append_attempts(), 3);
}

#[tokio::test]
async fn single_attempt_config_gives_up_on_first_conflict() {
    let h = Harness::new(1);
    h.store.interleave(vec![added(5)]);

    let error = h.stream.transact(|_| [added(1)]).await.unwrap_err();

    assert!(error.is_attempts_exhausted());
    assert_eq!(h.store.loads(), 1);
}

#[tokio::test]
async fn raised_attempt_limit_outlasts_contention() {
    let h = Harness::new(6);
    for _ in 0..5 {
        h.store.interleave(vec![added(1)]);
    }

    h.stream.transact(|_| [added(100)]).await.unwrap();

    assert_eq!(h.store.loads(), 6);
    assert_eq!(h.stream.query(|total| *total).await.unwrap(), 105);
}

// ============================================================================
// Decide
// ============================================================================

#[tokio::test]
async fn decide_returns_value_from_committing_attempt() {
    let h = Harness::new(3);
    h.seed(&[1, 1]).await;
    h.store.interleave(vec![added(1)]);

    // "Assign the next ticket number."
    let ticket = h
        .stream
        .decide(|acc| {
            acc.execute(|_| [added(1)]);
            acc.state()
        })
        .await
        .unwrap();

    assert_eq!(ticket, 4);
    assert_eq!(h.stored_amounts(), vec![1, 1, 1, 1]);
}

#[tokio::test]
async fn decide_commits_every_step_of_the_pass() {
    let h = Harness::new(3);

    let steps = h
        .stream
        .decide(|acc| {
            let mut steps = 0;
            while acc.state() < 10 {
                acc.execute(|total| [added(total + 1)]);
                steps += 1;
            }
            steps
        })
        .await
        .unwrap();

    // 0 -> +1 -> 1 -> +2 -> 3 -> +4 -> 7 -> +8 -> 15
    assert_eq!(steps, 4);
    assert_eq!(h.stored_amounts(), vec![1, 2, 4, 8]);
    assert_eq!(h.store.append_attempts(), 1);
}

#[tokio::test]
async fn decide_and_transact_commit_the_same_events() {
    let via_transact = Harness::new(3);
    let via_decide = Harness::new(3);
    via_transact.seed(&[3]).await;
    via_decide.seed(&[3]).await;

    let interpret = |total: &i64| vec![added(*total), added(-1)];

    via_transact.stream.transact(interpret).await.unwrap();
    via_decide
        .stream
        .decide(|acc| {
            acc.execute(interpret);
            "ignored"
        })
        .await
        .unwrap();

    assert_eq!(via_transact.stored_amounts(), via_decide.stored_amounts());
    assert_eq!(via_decide.stored_amounts(), vec![3, 3, -1]);
}

// ============================================================================
// Query
// ============================================================================

#[tokio::test]
async fn query_never_appends() {
    let h = Harness::new(3);
    h.seed(&[2, 2]).await;
    h.store.interleave(vec![added(100)]);

    let summary = h
        .stream
        .query(|total| format!("total={total}, even={}", total % 2 == 0))
        .await
        .unwrap();

    assert_eq!(summary, "total=4, even=true");
    assert_eq!(h.store.append_attempts(), 0);
    assert_eq!(h.store.pending_rivals(), 1);
    assert_eq!(h.events.write_count(), 1);
}

#[tokio::test]
async fn query_on_fresh_stream_sees_initial_state() {
    let h = Harness::new(3);
    assert_eq!(h.stream.query(|total| *total).await.unwrap(), 0);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn domain_rejection_aborts_without_retry() {
    let h = Harness::new(3);
    h.seed(&[9]).await;

    let error = h
        .stream
        .try_transact(|total| {
            if *total >= 9 {
                Err(LimitReached { limit: 9 })
            } else {
                Ok(vec![added(1)])
            }
        })
        .await
        .unwrap_err();

    assert_eq!(error.into_domain(), Some(LimitReached { limit: 9 }));
    assert_eq!(h.store.loads(), 1);
    assert_eq!(h.store.append_attempts(), 0);
}

#[tokio::test]
async fn domain_rejection_after_conflict_still_aborts() {
    let h = Harness::new(3);
    h.store.interleave(vec![added(8)]);

    let error = h
        .stream
        .try_transact(|total| {
            if *total + 5 > 10 {
                Err(LimitReached { limit: 10 })
            } else {
                Ok(vec![added(5)])
            }
        })
        .await
        .unwrap_err();

    assert!(matches!(error, StreamError::Domain(LimitReached { limit: 10 })));
    assert_eq!(h.store.loads(), 2);
    assert_eq!(h.stored_amounts(), vec![8]);
}

#[tokio::test]
async fn try_decide_rejection_discards_earlier_proposals() {
    let h = Harness::new(3);

    let error = h
        .stream
        .try_decide(|acc| {
            acc.execute(|_| [added(6)]);
            acc.try_execute(|total| {
                if *total > 5 {
                    Err(LimitReached { limit: 5 })
                } else {
                    Ok(vec![added(1)])
                }
            })?;
            Ok(acc.state())
        })
        .await
        .unwrap_err();

    assert_eq!(error.into_domain(), Some(LimitReached { limit: 5 }));
    assert!(h.stored_amounts().is_empty());
}

#[tokio::test]
async fn load_failure_propagates_without_retry() {
    let h = Harness::new(3);
    h.store
        .fail_next_load(EventStoreError::DatabaseError("connection refused".into()));

    let error = h.stream.transact(|_| [added(1)]).await.unwrap_err();

    assert!(matches!(
        error,
        StreamError::Store(EventStoreError::DatabaseError(ref message)) if message == "connection refused"
    ));
    assert_eq!(h.store.loads(), 1);
    assert_eq!(h.store.append_attempts(), 0);
}

#[tokio::test]
async fn append_failure_propagates_without_retry() {
    let h = Harness::new(3);
    h.store
        .fail_next_append(EventStoreError::IoError("broken pipe".into()));

    let error = h.stream.transact(|_| [added(1)]).await.unwrap_err();

    assert!(matches!(error, StreamError::Store(EventStoreError::IoError(_))));
    assert_eq!(h.store.loads(), 1);
    assert_eq!(h.store.append_attempts(), 1);
    assert!(h.stored_amounts().is_empty());
}

#[tokio::test]
async fn query_surfaces_load_failure() {
    let h = Harness::new(3);
    h.store
        .fail_next_load(EventStoreError::StreamNotFound(stream_id()));

    let error = h.stream.query(|total| *total).await.unwrap_err();

    assert!(matches!(
        error,
        StreamError::Store(EventStoreError::StreamNotFound(_))
    ));
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn cancellation_between_attempts_stops_the_retry() {
    let h = Harness::new(3);
    h.store.interleave(vec![added(5)]);
    let (cancel, signal) = watch::channel(false);
    let stream = h.stream.clone().with_cancellation(signal);

    let error = stream
        .transact(|_| {
            // Cancellation arrives while the first attempt is in flight.
            cancel.send_replace(true);
            [added(1)]
        })
        .await
        .unwrap_err();

    assert!(error.is_cancelled());
    assert_eq!(h.store.loads(), 1);
    assert!(h.store.committed().is_empty());
    assert_eq!(h.stored_amounts(), vec![5]);
}

#[tokio::test]
async fn cancelled_query_does_not_load() {
    let h = Harness::new(3);
    let (_cancel, signal) = watch::channel(true);

    let error = h
        .stream
        .clone()
        .with_cancellation(signal)
        .query(|total| *total)
        .await
        .unwrap_err();

    assert!(error.is_cancelled());
    assert_eq!(h.store.loads(), 0);
}

// ============================================================================
// Concurrent writers
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_all_commit_exactly_once() {
    const WRITERS: u32 = 8;
    let h = Harness::new(WRITERS);

    let tasks: Vec<_> = (0..WRITERS)
        .map(|_| {
            let stream = h.stream.clone();
            tokio::spawn(async move { stream.transact(|_| [added(1)]).await })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        result.expect("writer task panicked").expect("writer failed");
    }

    assert_eq!(h.stored_amounts().len(), WRITERS as usize);
    assert_eq!(
        h.stream.query(|total| *total).await.unwrap(),
        i64::from(WRITERS)
    );
}
