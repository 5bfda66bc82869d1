//! # Composable Stream Core
//!
//! Core types for event-sourced streams that are written under optimistic
//! concurrency.
//!
//! A stream is an ordered, append-only list of events. Its state is never
//! stored; it is the fold of the events over an initial value. Writers read
//! the state at some [`Version`](stream::Version), decide which events to add,
//! and append them only if the stream is still at that version.
//!
//! ## Core Concepts
//!
//! - **Event**: an immutable fact, serialized into a [`SerializedEvent`](event::SerializedEvent) envelope
//! - **Fold**: `(state, events) -> state`, shared as a [`FoldFn`](accumulator::FoldFn)
//! - **Version**: the number of events in a stream, used as the expected version on append
//! - **Accumulator**: a decision pass's view of the state plus everything proposed so far
//! - **Stores**: [`EventStore`](event_store::EventStore) speaks bytes,
//!   [`StreamStore`](stream_store::StreamStore) speaks typed events and folded state
//!
//! The retry loop that ties these together lives in `composable-stream-runtime`.
//!
//! ## Example
//!
//! ```
//! use composable_stream_core::accumulator::{Accumulator, evolve};
//!
//! let fold = evolve(|total: i64, delta: &i64| total + delta);
//! let mut acc = Accumulator::new(fold.as_ref(), 10);
//!
//! acc.execute(|total| if *total < 20 { vec![5] } else { vec![] });
//! acc.execute(|total| vec![*total]);
//!
//! assert_eq!(acc.accumulated(), &[5, 15]);
//! assert_eq!(acc.state(), 30);
//! ```

// Re-export commonly used types
pub use serde::{Deserialize, Serialize};

/// Decision-pass accumulator and fold helpers
pub mod accumulator;

/// Event envelopes and the `bincode` default encoding
pub mod event;

/// Typed event <-> envelope codecs
pub mod codec;

/// Byte-level event store trait and errors
pub mod event_store;

/// Stream identifiers and versions
pub mod stream;

/// Typed store with folded loads and conditional appends
pub mod stream_store;
