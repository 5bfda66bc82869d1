//! Errors surfaced by [`TransactionalStream`](crate::TransactionalStream) operations.

use composable_stream_core::event_store::EventStoreError;
use composable_stream_core::stream::StreamId;
use std::convert::Infallible;
use thiserror::Error;

/// Why a transact, decide or query call failed.
///
/// Exactly one of these is returned; a failed call never leaves a partial
/// write behind.
///
/// `D` is the decision step's own error type. Operations whose decisions
/// cannot fail use the default, [`Infallible`], so the `Domain` variant is
/// uninhabited for them.
#[derive(Error, Debug)]
pub enum StreamError<D: std::error::Error + Send + Sync + 'static = Infallible> {
    /// The decision step rejected the command. Never retried.
    #[error(transparent)]
    Domain(D),

    /// Every attempt lost the race to a concurrent writer.
    ///
    /// Nothing proposed by any attempt was written. The caller decides
    /// whether to re-issue, back off, or give up.
    #[error("Stream {stream_id}: gave up after {attempts} conflicting attempts")]
    AttemptsExhausted {
        /// Stream that stayed contended.
        stream_id: StreamId,
        /// Attempts made, all of which conflicted.
        attempts: u32,
    },

    /// The store failed for a reason other than a version conflict.
    #[error("Event store error: {0}")]
    Store(#[from] EventStoreError),

    /// The cancellation signal fired before the operation committed.
    #[error("Stream {stream_id}: operation cancelled")]
    Cancelled {
        /// Stream the operation targeted.
        stream_id: StreamId,
    },
}

impl<D: std::error::Error + Send + Sync + 'static> StreamError<D> {
    /// `true` for [`StreamError::AttemptsExhausted`].
    #[must_use]
    pub const fn is_attempts_exhausted(&self) -> bool {
        matches!(self, Self::AttemptsExhausted { .. })
    }

    /// `true` for [`StreamError::Cancelled`].
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The decision step's error, if that is what failed.
    #[must_use]
    pub fn into_domain(self) -> Option<D> {
        match self {
            Self::Domain(error) => Some(error),
            _ => None,
        }
    }
}

impl StreamError<Infallible> {
    /// Re-type an error from an infallible decision into any domain error type.
    ///
    /// Lets `transact` results flow into functions that also call `try_transact`.
    #[must_use]
    pub fn widen<D: std::error::Error + Send + Sync + 'static>(self) -> StreamError<D> {
        match self {
            Self::Domain(never) => match never {},
            Self::AttemptsExhausted {
                stream_id,
                attempts,
            } => StreamError::AttemptsExhausted {
                stream_id,
                attempts,
            },
            Self::Store(error) => StreamError::Store(error),
            Self::Cancelled { stream_id } => StreamError::Cancelled { stream_id },
        }
    }
}
