//! # Counter Demo
//!
//! An event-sourced counter written through a `TransactionalStream`.
//!
//! The counter's state is never stored. It is the fold of its events, and
//! every command reads the latest state, decides which events to add, and
//! commits them under optimistic concurrency.
//!
//! ## Example
//!
//! ```no_run
//! use composable_stream_core::stream::StreamId;
//! use composable_stream_testing::InMemoryEventStore;
//! use counter::{Counter, in_memory_counter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let clicks: Counter = in_memory_counter(&InMemoryEventStore::new(), StreamId::new("clicks"));
//!
//! counter::increment(&clicks, 1).await?;
//! assert_eq!(counter::current(&clicks).await?, 1);
//! # Ok(())
//! # }
//! ```

use composable_stream_core::accumulator::{FoldFn, evolve};
use composable_stream_core::codec::JsonCodec;
use composable_stream_core::event::Event;
use composable_stream_core::event_store::EventStore;
use composable_stream_core::stream::StreamId;
use composable_stream_core::stream_store::StreamStore;
use composable_stream_runtime::{FoldingStore, StreamError, TransactionalStream};
use composable_stream_testing::InMemoryEventStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Counter events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CounterEvent {
    /// The counter moved up
    Incremented {
        /// Amount added
        by: i64,
    },
    /// The counter moved down
    Decremented {
        /// Amount removed
        by: i64,
    },
    /// The counter went back to zero
    Reset,
}

impl Event for CounterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Incremented { .. } => "Incremented.v1",
            Self::Decremented { .. } => "Decremented.v1",
            Self::Reset => "Reset.v1",
        }
    }
}

/// Counter state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterState {
    /// Current count value
    pub count: i64,
}

impl CounterState {
    /// Apply one event.
    #[must_use]
    pub const fn apply(self, event: &CounterEvent) -> Self {
        let count = match event {
            CounterEvent::Incremented { by } => self.count + *by,
            CounterEvent::Decremented { by } => self.count - *by,
            CounterEvent::Reset => 0,
        };
        Self { count }
    }
}

/// Commands the counter refuses.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CounterError {
    /// The decrement would take the count below zero.
    #[error("cannot take {requested} from a count of {available}")]
    WouldGoNegative {
        /// Amount asked for
        requested: i64,
        /// Count at decision time
        available: i64,
    },
}

/// `COUNTER_MAX_ATTEMPTS` was set to something other than a positive integer.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("COUNTER_MAX_ATTEMPTS must be a positive integer, got {0:?}")]
pub struct InvalidMaxAttempts(pub String);

/// Parse an attempt limit from the environment. Zero is rejected.
///
/// # Errors
///
/// [`InvalidMaxAttempts`] for anything but `1..=u32::MAX`.
pub fn parse_max_attempts(raw: &str) -> Result<u32, InvalidMaxAttempts> {
    match raw.trim().parse::<u32>() {
        Ok(attempts) if attempts > 0 => Ok(attempts),
        _ => Err(InvalidMaxAttempts(raw.to_string())),
    }
}

/// Transactional handle to one counter stream.
pub type Counter = TransactionalStream<CounterEvent, CounterState>;

/// The counter fold.
#[must_use]
pub fn fold() -> FoldFn<CounterState, CounterEvent> {
    evolve(|state: CounterState, event: &CounterEvent| state.apply(event))
}

/// Typed store for counters kept as JSON in `events`.
#[must_use]
pub fn counter_store(events: Arc<dyn EventStore>) -> Arc<dyn StreamStore<CounterEvent, CounterState>> {
    Arc::new(FoldingStore::new(events, JsonCodec, CounterState::default(), fold()))
}

/// A counter over an in-memory event store.
#[must_use]
pub fn in_memory_counter(events: &InMemoryEventStore, stream_id: StreamId) -> Counter {
    Counter::new(counter_store(Arc::new(events.clone())), stream_id, fold())
}

/// Add `by` to the counter.
///
/// # Errors
///
/// Store failures, cancellation, or losing every attempt to other writers.
pub async fn increment(counter: &Counter, by: i64) -> Result<(), StreamError> {
    counter
        .transact(|_| [CounterEvent::Incremented { by }])
        .await
}

/// Take `by` from the counter, refusing to go below zero.
///
/// # Errors
///
/// [`StreamError::Domain`] with [`CounterError::WouldGoNegative`], or any
/// failure [`increment`] can report.
pub async fn decrement(counter: &Counter, by: i64) -> Result<(), StreamError<CounterError>> {
    counter
        .try_transact(|state| {
            if state.count < by {
                Err(CounterError::WouldGoNegative {
                    requested: by,
                    available: state.count,
                })
            } else {
                Ok([CounterEvent::Decremented { by }])
            }
        })
        .await
}

/// Reset to zero. A counter already at zero is left untouched.
///
/// # Errors
///
/// As [`increment`].
pub async fn reset(counter: &Counter) -> Result<(), StreamError> {
    counter
        .transact(|state| (state.count != 0).then_some(CounterEvent::Reset))
        .await
}

/// Increment and return the count this call produced, like a ticket
/// dispenser.
///
/// # Errors
///
/// As [`increment`].
pub async fn take_ticket(counter: &Counter) -> Result<i64, StreamError> {
    counter
        .decide(|acc| {
            acc.execute(|_| [CounterEvent::Incremented { by: 1 }]);
            acc.state().count
        })
        .await
}

/// The current count.
///
/// # Errors
///
/// Store failures or cancellation.
pub async fn current(counter: &Counter) -> Result<i64, StreamError> {
    counter.query(|state| state.count).await
}
