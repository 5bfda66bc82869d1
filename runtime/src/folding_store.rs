//! Typed [`StreamStore`] over a byte-level [`EventStore`].
//!
//! `load` replays every stored envelope through a [`Codec`] and the caller's
//! fold; the version handed back is the number of envelopes read. `try_append`
//! encodes the batch and appends it with that version as the expectation,
//! translating the store's conflict error into [`AppendOutcome::Conflict`].

use composable_stream_core::accumulator::FoldFn;
use composable_stream_core::codec::Codec;
use composable_stream_core::event_store::{EventStore, EventStoreError};
use composable_stream_core::stream::{StreamId, Version};
use composable_stream_core::stream_store::{AppendOutcome, StreamStore};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

/// Decode-and-fold adapter from [`EventStore`] to [`StreamStore`].
///
/// # Example
///
/// ```ignore
/// let store = FoldingStore::new(
///     Arc::new(InMemoryEventStore::new()) as Arc<dyn EventStore>,
///     JsonCodec,
///     CounterState::default(),
///     evolve(CounterState::apply),
/// );
/// ```
pub struct FoldingStore<E, S, C> {
    events: Arc<dyn EventStore>,
    codec: C,
    initial: S,
    fold: FoldFn<S, E>,
    _event: PhantomData<fn() -> E>,
}

impl<E, S, C> FoldingStore<E, S, C> {
    /// Build the adapter.
    ///
    /// `initial` is the state of a stream with no events; `fold` must be the
    /// same fold the [`TransactionalStream`](crate::TransactionalStream) uses.
    #[must_use]
    pub fn new(events: Arc<dyn EventStore>, codec: C, initial: S, fold: FoldFn<S, E>) -> Self {
        Self {
            events,
            codec,
            initial,
            fold,
            _event: PhantomData,
        }
    }

    /// The underlying byte-level store.
    #[must_use]
    pub fn event_store(&self) -> &Arc<dyn EventStore> {
        &self.events
    }
}

impl<E, S, C> fmt::Debug for FoldingStore<E, S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FoldingStore").finish_non_exhaustive()
    }
}

impl<E, S, C> StreamStore<E, S> for FoldingStore<E, S, C>
where
    E: Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
    C: Codec<E> + 'static,
{
    fn load<'a>(
        &'a self,
        stream_id: &'a StreamId,
    ) -> Pin<Box<dyn Future<Output = Result<(S, Version), EventStoreError>> + Send + 'a>> {
        Box::pin(async move {
            let stored = self.events.load_events(stream_id.clone(), None).await?;
            let events = stored
                .iter()
                .map(|envelope| self.codec.decode(envelope))
                .collect::<Result<Vec<E>, _>>()?;

            let version = Version::new(events.len() as u64);
            tracing::trace!(stream_id = %stream_id, %version, "Folded stream");

            let state = (self.fold)(self.initial.clone(), &events);
            Ok((state, version))
        })
    }

    fn try_append<'a>(
        &'a self,
        stream_id: &'a StreamId,
        expected: Version,
        events: Vec<E>,
    ) -> Pin<Box<dyn Future<Output = Result<AppendOutcome, EventStoreError>> + Send + 'a>> {
        Box::pin(async move {
            let encoded = events
                .iter()
                .map(|event| self.codec.encode(event))
                .collect::<Result<Vec<_>, _>>()?;

            match self
                .events
                .append_events(stream_id.clone(), Some(expected), encoded)
                .await
            {
                Ok(version) => Ok(AppendOutcome::Written(version)),
                Err(EventStoreError::ConcurrencyConflict { actual, .. }) => {
                    Ok(AppendOutcome::Conflict { actual })
                }
                Err(error) => Err(error),
            }
        })
    }
}
