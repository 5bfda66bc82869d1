//! Byte-level event store abstraction.
//!
//! This is the shape a storage engine implements: append envelopes to a stream
//! under an expected version, and read them back in order. It knows nothing
//! about event types or state. The typed view the transaction loop consumes is
//! [`StreamStore`](crate::stream_store::StreamStore); `FoldingStore` in the
//! runtime crate bridges the two.
//!
//! # Example
//!
//! ```no_run
//! use composable_stream_core::event_store::{EventStore, EventStoreError};
//! use composable_stream_core::stream::{StreamId, Version};
//!
//! async fn replay_count<S: EventStore>(store: &S) -> Result<usize, EventStoreError> {
//!     let events = store.load_events(StreamId::new("counter-1"), None).await?;
//!     Ok(events.len())
//! }
//!
//! async fn append_first<S: EventStore>(store: &S) -> Result<Version, EventStoreError> {
//!     // An empty stream is at Version::INITIAL.
//!     store
//!         .append_events(StreamId::new("counter-1"), Some(Version::INITIAL), vec![])
//!         .await
//! }
//! ```

use crate::event::SerializedEvent;
use crate::stream::{StreamId, Version};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Failures reported by a store.
///
/// `ConcurrencyConflict` is the only variant the transaction loop treats as
/// recoverable. Everything else aborts the operation and reaches the caller
/// unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventStoreError {
    /// The stream moved past the expected version; nothing was written.
    #[error("Concurrency conflict on {stream_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// Stream that rejected the append.
        stream_id: StreamId,
        /// Version the writer loaded.
        expected: Version,
        /// Version the stream is actually at.
        actual: Version,
    },

    /// The store refuses to serve this stream at all.
    #[error("Stream not found: {0}")]
    StreamNotFound(StreamId),

    /// Backend unavailable or query failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Stored bytes could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Transport or filesystem failure.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl EventStoreError {
    /// `true` for [`EventStoreError::ConcurrencyConflict`].
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

impl From<crate::event::EventError> for EventStoreError {
    fn from(error: crate::event::EventError) -> Self {
        Self::SerializationError(error.to_string())
    }
}

/// Append-only, versioned storage of [`SerializedEvent`]s.
///
/// Implementations must make `append_events` atomic: either every envelope
/// in the batch is stored and the version advances by the batch length, or
/// nothing is stored.
///
/// The trait returns boxed futures so it can be used as `Arc<dyn EventStore>`.
pub trait EventStore: Send + Sync {
    /// Append a batch of envelopes.
    ///
    /// - `expected_version = Some(v)`: write only if the stream is at `v`.
    /// - `expected_version = None`: write unconditionally.
    ///
    /// Returns the stream version after the write. An empty batch writes
    /// nothing and returns the current version (after the version check).
    ///
    /// # Errors
    ///
    /// - [`EventStoreError::ConcurrencyConflict`] on a stale `expected_version`
    /// - [`EventStoreError::DatabaseError`] / [`EventStoreError::IoError`] on backend failure
    fn append_events(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<Version, EventStoreError>> + Send + '_>>;

    /// Load envelopes in append order.
    ///
    /// `from_version = Some(v)` skips the first `v` events; `None` loads
    /// everything. A stream that was never written is empty, not an error.
    ///
    /// # Errors
    ///
    /// - [`EventStoreError::DatabaseError`] / [`EventStoreError::IoError`] on backend failure
    fn load_events(
        &self,
        stream_id: StreamId,
        from_version: Option<Version>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SerializedEvent>, EventStoreError>> + Send + '_>>;
}
