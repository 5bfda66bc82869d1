//! # Composable Stream Testing
//!
//! In-memory doubles for exercising transactional streams without a database.
//!
//! - [`InMemoryEventStore`]: byte-level store with real version checks
//! - [`InterleavingStore`]: wraps a typed store to stage rival writers and
//!   failures, and counts what the transaction loop asked for
//!
//! ## Example
//!
//! ```ignore
//! use composable_stream_testing::{InMemoryEventStore, InterleavingStore};
//!
//! #[tokio::test]
//! async fn retries_after_rival_write() {
//!     let folding = FoldingStore::new(Arc::new(InMemoryEventStore::new()), JsonCodec, 0, fold.clone());
//!     let store = Arc::new(InterleavingStore::new(Arc::new(folding)));
//!     store.interleave(vec![CounterEvent::Added { amount: 5 }]);
//!
//!     let stream = TransactionalStream::new(store.clone(), StreamId::new("counter-1"), fold);
//!     stream.transact(|_| [CounterEvent::Added { amount: 1 }]).await.unwrap();
//!
//!     assert_eq!(store.loads(), 2);
//! }
//! ```

mod event_store_mocks;
mod interleaving;

/// Mock implementations for testing.
pub mod mocks {
    pub use crate::event_store_mocks::InMemoryEventStore;
    pub use crate::interleaving::InterleavingStore;
}

pub use mocks::{InMemoryEventStore, InterleavingStore};
