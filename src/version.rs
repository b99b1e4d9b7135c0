//! Types for per-stream versioning and store-wide global positions.

/// A 1-based per-stream event counter.
///
/// Used by [`crate::event::Event`] and the append path to implement
/// optimistic concurrency.
pub type Version = u32;

/// A store-wide, strictly increasing, 64-bit position assigned at append
/// time by the underlying engine's monotonic counter.
pub type GlobalPosition = i64;

/// The version a caller expects a stream to currently be at before
/// appending new events.
///
/// `ExpectedVersion::new(0)` means "this stream does not exist yet, create
/// it".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpectedVersion(pub Version);

impl ExpectedVersion {
    /// The expected version for a brand new stream.
    pub const NEW: ExpectedVersion = ExpectedVersion(0);

    #[must_use]
    pub fn new(version: Version) -> Self {
        ExpectedVersion(version)
    }

    #[must_use]
    pub fn is_new(self) -> bool {
        self.0 == 0
    }
}

impl From<Version> for ExpectedVersion {
    fn from(version: Version) -> Self {
        ExpectedVersion(version)
    }
}

/// Returned when an append observed a `LastVersion` different from the
/// caller's `expected_version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("concurrency conflict: expected version {expected}, found {actual}")]
pub struct ConflictError {
    /// The version the caller expected the stream to be at.
    pub expected: Version,
    /// The version the stream was actually found at.
    pub actual: Version,
}
