//! Event naming and the stored event envelope.
//!
//! The transaction core works on typed events only. The [`Event`] trait and
//! [`SerializedEvent`] exist for the edge where typed events meet a byte-level
//! [`EventStore`](crate::event_store::EventStore); see [`crate::codec`].

use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Errors raised while turning events into bytes or back.
#[derive(Error, Debug)]
pub enum EventError {
    /// The event could not be encoded.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// The stored bytes could not be decoded into the event type.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),

    /// The stored type tag does not match what the payload decoded to.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
}

/// A domain event that can be persisted.
///
/// `event_type` is a stable, versioned tag such as `"Incremented.v1"`. It is
/// written next to the payload so stores and tooling can route or filter
/// without decoding.
///
/// # Examples
///
/// ```
/// use composable_stream_core::event::Event;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// enum CounterEvent {
///     Added { amount: i64 },
///     Reset,
/// }
///
/// impl Event for CounterEvent {
///     fn event_type(&self) -> &'static str {
///         match self {
///             CounterEvent::Added { .. } => "Added.v1",
///             CounterEvent::Reset => "Reset.v1",
///         }
///     }
/// }
///
/// let bytes = CounterEvent::Added { amount: 2 }.to_bytes().unwrap();
/// assert_eq!(CounterEvent::from_bytes(&bytes).unwrap(), CounterEvent::Added { amount: 2 });
/// ```
pub trait Event: Send + Sync + 'static {
    /// Stable, versioned type tag for this event.
    fn event_type(&self) -> &'static str;

    /// Encode with `bincode`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if `bincode` rejects the value.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Decode from `bincode` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] for corrupt bytes or bytes
    /// written by an incompatible schema.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// An event as the byte-level store sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct SerializedEvent {
    /// Type tag, copied from [`Event::event_type`].
    pub event_type: String,

    /// Encoded payload. The format belongs to the codec that wrote it.
    pub data: Vec<u8>,

    /// Optional free-form metadata (correlation ids and the like).
    pub metadata: Option<serde_json::Value>,
}

impl SerializedEvent {
    /// Build an envelope from its parts.
    #[must_use]
    pub const fn new(
        event_type: String,
        data: Vec<u8>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_type,
            data,
            metadata,
        }
    }

    /// Attach metadata, replacing any already present.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}
