//! A [`StreamStore`] wrapper that stages contention and failures.
//!
//! Tests of the transaction loop need to control exactly when a rival writer
//! lands, when the store breaks, and to count every load and append the loop
//! performs. [`InterleavingStore`] wraps a real store and does all three:
//!
//! - [`interleave`](InterleavingStore::interleave) queues a rival batch that is
//!   written straight through to the inner store immediately before the next
//!   caller append, so that append genuinely conflicts.
//! - [`fail_next_load`](InterleavingStore::fail_next_load) and
//!   [`fail_next_append`](InterleavingStore::fail_next_append) queue errors.
//! - counters record loads, append attempts and the batches that committed.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use composable_stream_core::event_store::EventStoreError;
use composable_stream_core::stream::{StreamId, Version};
use composable_stream_core::stream_store::{AppendOutcome, StreamStore};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Contention-staging wrapper around any [`StreamStore`].
pub struct InterleavingStore<E, S> {
    inner: Arc<dyn StreamStore<E, S>>,
    rivals: Mutex<VecDeque<Vec<E>>>,
    load_failures: Mutex<VecDeque<EventStoreError>>,
    append_failures: Mutex<VecDeque<EventStoreError>>,
    loads: AtomicUsize,
    append_attempts: AtomicUsize,
    committed: Mutex<Vec<Vec<E>>>,
}

impl<E, S> InterleavingStore<E, S>
where
    E: Clone + Send + 'static,
    S: Send + 'static,
{
    /// Wrap `inner`. With nothing queued the wrapper only counts.
    #[must_use]
    pub fn new(inner: Arc<dyn StreamStore<E, S>>) -> Self {
        Self {
            inner,
            rivals: Mutex::new(VecDeque::new()),
            load_failures: Mutex::new(VecDeque::new()),
            append_failures: Mutex::new(VecDeque::new()),
            loads: AtomicUsize::new(0),
            append_attempts: AtomicUsize::new(0),
            committed: Mutex::new(Vec::new()),
        }
    }

    /// Queue a rival batch to land just before the next caller append.
    ///
    /// Queue one batch per attempt that should conflict. If the rival itself
    /// is rejected, that append fails with
    /// [`EventStoreError::ConcurrencyConflict`] rather than staging nothing.
    pub fn interleave(&self, batch: Vec<E>) -> &Self {
        self.rivals.lock().unwrap().push_back(batch);
        self
    }

    /// Make the next load fail with `error`.
    pub fn fail_next_load(&self, error: EventStoreError) -> &Self {
        self.load_failures.lock().unwrap().push_back(error);
        self
    }

    /// Make the next append fail with `error` before it reaches the inner store.
    pub fn fail_next_append(&self, error: EventStoreError) -> &Self {
        self.append_failures.lock().unwrap().push_back(error);
        self
    }

    /// Loads requested by the caller, including failed ones.
    #[must_use]
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Appends requested by the caller, including conflicting and failed ones.
    #[must_use]
    pub fn append_attempts(&self) -> usize {
        self.append_attempts.load(Ordering::SeqCst)
    }

    /// Caller batches the inner store accepted, in commit order. Rival batches
    /// are not included.
    #[must_use]
    pub fn committed(&self) -> Vec<Vec<E>> {
        self.committed.lock().unwrap().clone()
    }

    /// Rival batches still waiting for an append.
    #[must_use]
    pub fn pending_rivals(&self) -> usize {
        self.rivals.lock().unwrap().len()
    }
}

impl<E, S> fmt::Debug for InterleavingStore<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterleavingStore")
            .field("loads", &self.loads.load(Ordering::SeqCst))
            .field("append_attempts", &self.append_attempts.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<E, S> StreamStore<E, S> for InterleavingStore<E, S>
where
    E: Clone + Send + 'static,
    S: Send + 'static,
{
    fn load<'a>(
        &'a self,
        stream_id: &'a StreamId,
    ) -> Pin<Box<dyn Future<Output = Result<(S, Version), EventStoreError>> + Send + 'a>> {
        Box::pin(async move {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let failure = self.load_failures.lock().unwrap().pop_front();
            if let Some(error) = failure {
                return Err(error);
            }
            self.inner.load(stream_id).await
        })
    }

    fn try_append<'a>(
        &'a self,
        stream_id: &'a StreamId,
        expected: Version,
        events: Vec<E>,
    ) -> Pin<Box<dyn Future<Output = Result<AppendOutcome, EventStoreError>> + Send + 'a>> {
        Box::pin(async move {
            self.append_attempts.fetch_add(1, Ordering::SeqCst);
            let failure = self.append_failures.lock().unwrap().pop_front();
            if let Some(error) = failure {
                return Err(error);
            }

            let rival = self.rivals.lock().unwrap().pop_front();
            if let Some(rival) = rival {
                let (_, current) = self.inner.load(stream_id).await?;
                match self.inner.try_append(stream_id, current, rival).await? {
                    AppendOutcome::Written(_) => {}
                    AppendOutcome::Conflict { actual } => {
                        return Err(EventStoreError::ConcurrencyConflict {
                            stream_id: stream_id.clone(),
                            expected: current,
                            actual,
                        });
                    }
                }
            }

            let outcome = self
                .inner
                .try_append(stream_id, expected, events.clone())
                .await?;
            if let AppendOutcome::Written(_) = outcome {
                self.committed.lock().unwrap().push(events);
            }
            Ok(outcome)
        })
    }
}
