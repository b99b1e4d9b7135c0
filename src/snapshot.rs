//! The per-stream [`Snapshot`].

use chrono::{DateTime, Utc};

use crate::version::Version;

/// A snapshot of a stream's aggregate state at a given version.
///
/// Keyed by `stream_id` alone, not `(domain, stream_id)`: a stream id
/// shared across domains will collide on the same snapshot row, a known
/// tradeoff (see DESIGN.md). At most one snapshot exists per `stream_id`:
/// saves upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// The stream id this snapshot was taken for.
    pub stream_id: String,
    /// The stream version the snapshot reflects.
    pub stream_version: Version,
    /// Opaque snapshot payload.
    pub data: Vec<u8>,
    /// When the snapshot was recorded.
    pub created_utc: DateTime<Utc>,
}
