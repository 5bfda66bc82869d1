//! Typed, fold-aware view of a stream: the capability the transaction loop needs.

use crate::event_store::EventStoreError;
use crate::stream::{StreamId, Version};
use std::future::Future;
use std::pin::Pin;

/// Result of a conditional append that reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The batch was stored; the stream is now at this version.
    Written(Version),
    /// The stream had moved on; nothing was stored.
    Conflict {
        /// Version the stream was actually at.
        actual: Version,
    },
}

impl AppendOutcome {
    /// `true` for [`AppendOutcome::Conflict`].
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Load state and conditionally append typed events for a stream.
///
/// `load` returns the caller's fold applied to every event ever appended,
/// together with the version that fold reflects. `try_append` stores the
/// batch only if the stream is still at `expected`; otherwise it reports
/// [`AppendOutcome::Conflict`] and stores nothing.
///
/// Conflicts are an outcome, not an error. `Err` is reserved for failures
/// the transaction loop must not retry.
pub trait StreamStore<E, S>: Send + Sync {
    /// Fold the stream into state.
    ///
    /// # Errors
    ///
    /// Any backend or decoding failure.
    fn load<'a>(
        &'a self,
        stream_id: &'a StreamId,
    ) -> Pin<Box<dyn Future<Output = Result<(S, Version), EventStoreError>> + Send + 'a>>;

    /// Append `events` if the stream is still at `expected`.
    ///
    /// # Errors
    ///
    /// Any backend or encoding failure. A stale version is reported through
    /// `Ok(AppendOutcome::Conflict { .. })`, never through `Err`.
    fn try_append<'a>(
        &'a self,
        stream_id: &'a StreamId,
        expected: Version,
        events: Vec<E>,
    ) -> Pin<Box<dyn Future<Output = Result<AppendOutcome, EventStoreError>> + Send + 'a>>;
}
