//! # Composable Stream Runtime
//!
//! The optimistic-concurrency transaction loop for event-sourced streams.
//!
//! [`TransactionalStream`] binds a [`StreamStore`](composable_stream_core::stream_store::StreamStore),
//! a stream id and a fold, and exposes four operations:
//!
//! - [`transact`](TransactionalStream::transact): propose events from the current state
//! - [`decide`](TransactionalStream::decide): run a multi-step decision and return a value
//! - [`query`](TransactionalStream::query): project the current state, never writes
//! - `try_` variants of the writing operations let decisions reject with a domain error
//!
//! Appends that lose a race are retried against freshly loaded state, up to
//! [`StreamConfig::max_attempts`] times in total.
//!
//! [`FoldingStore`] adapts any byte-level
//! [`EventStore`](composable_stream_core::event_store::EventStore) plus a
//! [`Codec`](composable_stream_core::codec::Codec) into a stream store.
//!
//! ## Example
//!
//! ```ignore
//! use composable_stream_runtime::{FoldingStore, TransactionalStream};
//!
//! let store = FoldingStore::new(event_store, JsonCodec, 0, fold.clone());
//! let counter = TransactionalStream::new(Arc::new(store), StreamId::new("counter-1"), fold);
//!
//! counter.transact(|_| [CounterEvent::Added { amount: 1 }]).await?;
//! let total = counter.query(|total| *total).await?;
//! ```

/// Retry limits for transactional streams
mod config;

/// Error types for transactional operations
pub mod error;

/// Event store + codec + fold adapter
mod folding_store;

/// Metric names and descriptions
pub mod metrics;

/// The load-decide-append loop
mod transactional;

pub use config::{DEFAULT_MAX_ATTEMPTS, StreamConfig};
pub use error::StreamError;
pub use folding_store::FoldingStore;
pub use transactional::TransactionalStream;
