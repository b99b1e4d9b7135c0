//! Core domain types for a durable, tiered event store: events, streams,
//! snapshots, archive segments, the NDJSON segment codec, and the
//! retention-policy lookup used by the archive coordinator.
//!
//! This crate has no database or filesystem dependency. The concrete
//! storage engine lives in `eventlog-postgres`.

#![allow(missing_docs)]

pub mod cancel;
pub mod codec;
pub mod config;
pub mod error;
pub mod event;
pub mod retention;
pub mod segment;
pub mod snapshot;
pub mod stream;
pub mod version;

pub use error::Error;
pub use event::{Event, NewEvent};
pub use retention::{RetentionMode, RetentionPolicyProvider};
pub use segment::{ArchiveSegment, SegmentStatus};
pub use snapshot::Snapshot;
pub use stream::StreamHeader;
pub use version::{ConflictError, ExpectedVersion, GlobalPosition, Version};
