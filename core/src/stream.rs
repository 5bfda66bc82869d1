//! Stream addressing and version tokens.
//!
//! A [`StreamId`] names one aggregate's event sequence in the external store.
//! A [`Version`] is the optimistic-concurrency token handed out by a load and
//! handed back on append: it counts the events in the stream at the moment the
//! state was read.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when parsing a [`StreamId`] from untrusted input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid stream ID: {0}")]
pub struct ParseStreamIdError(String);

/// Identity of one aggregate's event stream, e.g. `"counter-42"`.
///
/// The core never interprets the contents; it only passes the id to the
/// store and prints it in logs and errors.
///
/// Use `FromStr` for external input (empty ids are rejected). `new` and the
/// `From` impls accept anything and are meant for application-built ids.
///
/// # Examples
///
/// ```
/// use composable_stream_core::stream::StreamId;
///
/// let id = StreamId::new("counter-42");
/// assert_eq!(id.as_str(), "counter-42");
///
/// let parsed: StreamId = "todo-list-7".parse().unwrap();
/// assert_eq!(parsed.to_string(), "todo-list-7");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamId(String);

impl StreamId {
    /// Create a stream id without validation.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwrap into the owned `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StreamId {
    type Err = ParseStreamIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ParseStreamIdError("Stream ID cannot be empty".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for StreamId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StreamId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for StreamId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Optimistic-concurrency token: the number of events in a stream.
///
/// A load returns the version the state was folded at. An append passes that
/// version back; the store accepts the write only if nothing has been
/// appended since. Appending `n` events at version `v` yields `v + n`.
///
/// The transaction loop only ever compares versions for equality (inside the
/// store) and logs them. It never does arithmetic on them itself.
///
/// # Examples
///
/// ```
/// use composable_stream_core::stream::Version;
///
/// let empty = Version::INITIAL;
/// assert!(empty.is_initial());
/// assert_eq!(empty + 3, Version::new(3));
/// assert_eq!(Version::new(3).next().value(), 4);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// Version of a stream with no events.
    pub const INITIAL: Self = Self(0);

    /// Wrap a raw event count.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw event count.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Version after one more event. Saturates at `u64::MAX`.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// `true` for an empty stream.
    #[must_use]
    pub const fn is_initial(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Version> for u64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// Advance a version by a batch of `rhs` appended events. Saturates at `u64::MAX`.
impl std::ops::Add<u64> for Version {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0.saturating_add(rhs))
    }
}
