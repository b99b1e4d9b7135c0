//! The immutable [`Event`] record and the [`NewEvent`] shape callers
//! submit to the append path before a `GlobalPosition`/`Version` has been
//! assigned.

use chrono::{DateTime, Utc};

use crate::version::{GlobalPosition, Version};

/// An event submitted for append, before a [`Version`] and
/// [`GlobalPosition`] have been assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    /// The event type name.
    pub event_type: String,
    /// Logical sub-channel within the stream, used only for read
    /// filtering. Non-null; empty string allowed.
    pub namespace: String,
    /// Opaque event payload.
    pub data: Vec<u8>,
    /// Opaque, optional event metadata.
    pub metadata: Option<Vec<u8>>,
}

impl NewEvent {
    #[must_use]
    pub fn new(event_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        NewEvent {
            event_type: event_type.into(),
            namespace: String::new(),
            data: data.into(),
            metadata: None,
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: impl Into<Vec<u8>>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }
}

/// An immutable, persisted event.
///
/// Within any `(domain, stream_id)`, `version` values form a contiguous
/// sequence `1..=N`; `global_position` values are strictly increasing
/// store-wide, in commit order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Store-wide monotonically increasing position, assigned on insert.
    pub global_position: GlobalPosition,
    /// The stream's domain (category / retention-policy partition).
    pub domain: String,
    /// The stream id, unique within `domain`.
    pub stream_id: String,
    /// 1-based position of this event within its stream.
    pub version: Version,
    /// Logical sub-channel within the stream.
    pub namespace: String,
    /// The event type name.
    pub event_type: String,
    /// Opaque event payload.
    pub data: Vec<u8>,
    /// Opaque, optional event metadata.
    pub metadata: Option<Vec<u8>>,
    /// When the event was recorded, at microsecond resolution.
    pub created_utc: DateTime<Utc>,
}
