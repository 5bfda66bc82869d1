//! `FoldingStore` over the in-memory event store

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use composable_stream_core::accumulator::{FoldFn, evolve};
use composable_stream_core::codec::{BincodeCodec, Codec, JsonCodec};
use composable_stream_core::event::{Event, SerializedEvent};
use composable_stream_core::event_store::{EventStore, EventStoreError};
use composable_stream_core::stream::{StreamId, Version};
use composable_stream_core::stream_store::{AppendOutcome, StreamStore};
use composable_stream_runtime::{FoldingStore, StreamError, TransactionalStream};
use composable_stream_testing::InMemoryEventStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum TodoEvent {
    Added { id: u32, title: String },
    Completed { id: u32 },
}

impl Event for TodoEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Added { .. } => "Added.v1",
            Self::Completed { .. } => "Completed.v1",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Todos {
    open: Vec<u32>,
    done: Vec<u32>,
}

fn todo_fold() -> FoldFn<Todos, TodoEvent> {
    evolve(|mut todos: Todos, event: &TodoEvent| {
        match event {
            TodoEvent::Added { id, .. } => todos.open.push(*id),
            TodoEvent::Completed { id } => {
                todos.open.retain(|open| open != id);
                todos.done.push(*id);
            }
        }
        todos
    })
}

fn todo_store<C: Codec<TodoEvent> + 'static>(
    events: &InMemoryEventStore,
    codec: C,
) -> FoldingStore<TodoEvent, Todos, C> {
    FoldingStore::new(
        Arc::new(events.clone()) as Arc<dyn EventStore>,
        codec,
        Todos::default(),
        todo_fold(),
    )
}

fn added(id: u32) -> TodoEvent {
    TodoEvent::Added {
        id,
        title: format!("task {id}"),
    }
}

#[tokio::test]
async fn empty_stream_loads_initial_state_at_version_zero() {
    let events = InMemoryEventStore::new();
    let store = todo_store(&events, JsonCodec);

    let (state, version) = store.load(&StreamId::new("todos-1")).await.unwrap();

    assert_eq!(state, Todos::default());
    assert!(version.is_initial());
}

#[tokio::test]
async fn load_folds_and_counts_every_event() {
    let events = InMemoryEventStore::new();
    let store = todo_store(&events, JsonCodec);
    let id = StreamId::new("todos-1");

    store
        .try_append(&id, Version::INITIAL, vec![added(1), added(2)])
        .await
        .unwrap();
    store
        .try_append(&id, Version::new(2), vec![TodoEvent::Completed { id: 1 }])
        .await
        .unwrap();

    let (state, version) = store.load(&id).await.unwrap();
    assert_eq!(version, Version::new(3));
    assert_eq!(
        state,
        Todos {
            open: vec![2],
            done: vec![1],
        }
    );
}

#[tokio::test]
async fn stale_append_reports_conflict_and_writes_nothing() {
    let events = InMemoryEventStore::new();
    let store = todo_store(&events, BincodeCodec);
    let id = StreamId::new("todos-1");
    store
        .try_append(&id, Version::INITIAL, vec![added(1)])
        .await
        .unwrap();

    let outcome = store
        .try_append(&id, Version::INITIAL, vec![added(9)])
        .await
        .unwrap();

    assert_eq!(outcome, AppendOutcome::Conflict { actual: Version::new(1) });
    assert_eq!(events.event_count(&id), 1);
}

#[tokio::test]
async fn json_envelopes_carry_event_type_tags() {
    let events = InMemoryEventStore::new();
    let store = todo_store(&events, JsonCodec);
    let id = StreamId::new("todos-1");

    let outcome = store
        .try_append(&id, Version::INITIAL, vec![added(1), TodoEvent::Completed { id: 1 }])
        .await
        .unwrap();

    assert_eq!(outcome, AppendOutcome::Written(Version::new(2)));
    let tags: Vec<_> = events
        .events(&id)
        .into_iter()
        .map(|stored| stored.event_type)
        .collect();
    assert_eq!(tags, vec!["Added.v1", "Completed.v1"]);
}

#[tokio::test]
async fn undecodable_envelope_fails_the_operation_without_retry() {
    let events = InMemoryEventStore::new();
    let id = StreamId::new("todos-1");
    events
        .append_events(
            id.clone(),
            None,
            vec![SerializedEvent::new("Added.v1".to_string(), b"not json".to_vec(), None)],
        )
        .await
        .unwrap();
    let stream = TransactionalStream::new(
        Arc::new(todo_store(&events, JsonCodec)) as Arc<dyn StreamStore<TodoEvent, Todos>>,
        id.clone(),
        todo_fold(),
    );

    let error = stream.transact(|_| [added(2)]).await.unwrap_err();

    assert!(matches!(
        error,
        StreamError::Store(EventStoreError::SerializationError(_))
    ));
    assert_eq!(events.event_count(&id), 1);
}

#[tokio::test]
async fn transactional_stream_drives_a_todo_list() {
    let events = InMemoryEventStore::new();
    let id = StreamId::new("todos-1");
    let stream = TransactionalStream::new(
        Arc::new(todo_store(&events, BincodeCodec)) as Arc<dyn StreamStore<TodoEvent, Todos>>,
        id.clone(),
        todo_fold(),
    );

    let next_id = stream
        .decide(|acc| {
            let id = u32::try_from(acc.state().open.len()).unwrap() + 1;
            acc.execute(|_| [added(id)]);
            id
        })
        .await
        .unwrap();
    stream
        .transact(|todos| {
            todos
                .open
                .iter()
                .map(|id| TodoEvent::Completed { id: *id })
                .collect::<Vec<_>>()
        })
        .await
        .unwrap();

    assert_eq!(next_id, 1);
    let done = stream.query(|todos| todos.done.clone()).await.unwrap();
    assert_eq!(done, vec![1]);
    assert_eq!(events.write_count(), 2);
}
