//! Codecs between typed events and [`SerializedEvent`] envelopes.
//!
//! Two formats ship with the crate:
//!
//! - [`BincodeCodec`]: compact binary, the default for all-Rust deployments.
//! - [`JsonCodec`]: UTF-8 JSON, readable in the database and by other languages.
//!
//! Both write the event's [`Event::event_type`] tag into the envelope.

use crate::event::{Event, EventError, SerializedEvent};
use serde::{Serialize, de::DeserializeOwned};

/// Converts one event type to and from stored envelopes.
pub trait Codec<E>: Send + Sync {
    /// Encode an event into an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the payload cannot be encoded.
    fn encode(&self, event: &E) -> Result<SerializedEvent, EventError>;

    /// Decode an envelope back into an event.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] for unreadable payloads and
    /// [`EventError::UnknownEventType`] when the codec can tell the tag is wrong.
    fn decode(&self, stored: &SerializedEvent) -> Result<E, EventError>;
}

/// `bincode` payloads, via [`Event::to_bytes`] / [`Event::from_bytes`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl<E> Codec<E> for BincodeCodec
where
    E: Event + Serialize + DeserializeOwned,
{
    fn encode(&self, event: &E) -> Result<SerializedEvent, EventError> {
        Ok(SerializedEvent::new(
            event.event_type().to_string(),
            event.to_bytes()?,
            None,
        ))
    }

    fn decode(&self, stored: &SerializedEvent) -> Result<E, EventError> {
        E::from_bytes(&stored.data)
    }
}

/// UTF-8 JSON payloads.
///
/// Decoding also checks that the decoded event reports the same tag that was
/// stored, so a payload filed under the wrong type is caught instead of being
/// folded silently.
///
/// # Examples
///
/// ```
/// use composable_stream_core::codec::{Codec, JsonCodec};
/// use composable_stream_core::event::Event;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Renamed { title: String }
///
/// impl Event for Renamed {
///     fn event_type(&self) -> &'static str { "Renamed.v1" }
/// }
///
/// let stored = JsonCodec.encode(&Renamed { title: "groceries".into() }).unwrap();
/// assert_eq!(stored.data, br#"{"title":"groceries"}"#);
/// let back: Renamed = JsonCodec.decode(&stored).unwrap();
/// assert_eq!(back.title, "groceries");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<E> Codec<E> for JsonCodec
where
    E: Event + Serialize + DeserializeOwned,
{
    fn encode(&self, event: &E) -> Result<SerializedEvent, EventError> {
        let data =
            serde_json::to_vec(event).map_err(|e| EventError::SerializationError(e.to_string()))?;
        Ok(SerializedEvent::new(event.event_type().to_string(), data, None))
    }

    fn decode(&self, stored: &SerializedEvent) -> Result<E, EventError> {
        let event: E = serde_json::from_slice(&stored.data)
            .map_err(|e| EventError::DeserializationError(e.to_string()))?;
        if event.event_type() != stored.event_type {
            return Err(EventError::UnknownEventType(stored.event_type.clone()));
        }
        Ok(event)
    }
}
