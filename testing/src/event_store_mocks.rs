//! In-memory [`EventStore`] with real optimistic-concurrency checks.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use composable_stream_core::event::SerializedEvent;
use composable_stream_core::event_store::{EventStore, EventStoreError};
use composable_stream_core::stream::{StreamId, Version};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// `HashMap`-backed event store for fast, deterministic tests.
///
/// Appends are atomic under a write lock, so concurrent writers racing on the
/// same stream see exactly the conflicts a real store would report.
///
/// # Example
///
/// ```
/// use composable_stream_core::event::SerializedEvent;
/// use composable_stream_core::event_store::EventStore;
/// use composable_stream_core::stream::{StreamId, Version};
/// use composable_stream_testing::InMemoryEventStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryEventStore::new();
/// let stream = StreamId::new("counter-1");
/// let event = SerializedEvent::new("Added.v1".to_string(), vec![1], None);
///
/// let version = store.append_events(stream.clone(), Some(Version::INITIAL), vec![event]).await?;
/// assert_eq!(version, Version::new(1));
///
/// // A second writer still holding the empty-stream version loses.
/// let stale = store.append_events(stream.clone(), Some(Version::INITIAL), vec![]).await;
/// assert!(stale.is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryEventStore {
    streams: Arc<RwLock<HashMap<StreamId, Vec<SerializedEvent>>>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryEventStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events stored for `stream_id`.
    #[must_use]
    pub fn event_count(&self, stream_id: &StreamId) -> usize {
        self.streams
            .read()
            .unwrap()
            .get(stream_id)
            .map_or(0, Vec::len)
    }

    /// Snapshot of the envelopes stored for `stream_id`.
    #[must_use]
    pub fn events(&self, stream_id: &StreamId) -> Vec<SerializedEvent> {
        self.streams
            .read()
            .unwrap()
            .get(stream_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Appends that stored at least one event.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Drop every stream and reset the write counter.
    pub fn clear(&self) {
        self.streams.write().unwrap().clear();
        self.writes.store(0, Ordering::SeqCst);
    }

    fn append_now(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
    ) -> Result<Version, EventStoreError> {
        let mut streams = self.streams.write().unwrap();
        let stored = streams.entry(stream_id.clone()).or_default();
        let actual = Version::new(stored.len() as u64);

        match expected_version {
            Some(expected) if expected != actual => {
                return Err(EventStoreError::ConcurrencyConflict {
                    stream_id,
                    expected,
                    actual,
                });
            }
            _ => {}
        }

        if !events.is_empty() {
            stored.extend(events);
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(Version::new(stored.len() as u64))
    }

    fn load_now(&self, stream_id: &StreamId, from_version: Option<Version>) -> Vec<SerializedEvent> {
        let skip = from_version.map_or(0, |v| usize::try_from(v.value()).unwrap_or(usize::MAX));
        self.streams
            .read()
            .unwrap()
            .get(stream_id)
            .map(|stored| stored.iter().skip(skip).cloned().collect())
            .unwrap_or_default()
    }
}

impl EventStore for InMemoryEventStore {
    fn append_events(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<Version, EventStoreError>> + Send + '_>> {
        let result = self.append_now(stream_id, expected_version, events);
        Box::pin(async move { result })
    }

    fn load_events(
        &self,
        stream_id: StreamId,
        from_version: Option<Version>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SerializedEvent>, EventStoreError>> + Send + '_>>
    {
        let events = self.load_now(&stream_id, from_version);
        Box::pin(async move { Ok(events) })
    }
}
