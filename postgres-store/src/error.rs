//! Postgres/filesystem fault wrapping, converted to [`eventlog_core::Error`]
//! at each module boundary: low-level faults get wrapped with structural
//! context exactly once, then surfaced.

use eventlog_core::Error as CoreError;

/// A fault from the Postgres or filesystem layer, carrying enough context
/// to become a well-formed [`CoreError::Storage`].
///
/// Grounded on `eventually-postgres/src/event.rs`'s `StreamError`: a
/// `#[source]`-carrying enum distinguishing column decode failures from
/// generic database faults.
#[derive(Debug, thiserror::Error)]
pub enum PgError {
    /// A query or transaction against Postgres failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A column value in a result row couldn't be decoded.
    #[error("failed to read column '{name}': {source}")]
    Column {
        /// The column name.
        name: &'static str,
        /// The underlying decode fault.
        #[source]
        source: sqlx::Error,
    },

    /// A filesystem operation on the archive directory failed.
    #[error("archive filesystem error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted value didn't match an expected shape (e.g. an
    /// unrecognized `RetentionMode` or `SegmentStatus` discriminant, or a
    /// malformed segment file name).
    #[error("corrupt persisted value: {0}")]
    Corrupt(String),
}

impl PgError {
    /// Wraps this fault as [`CoreError::Storage`] with the given operation
    /// and stream context.
    pub fn into_core(
        self,
        operation: &'static str,
        domain: impl Into<Option<String>>,
        stream_id: impl Into<Option<String>>,
    ) -> CoreError {
        CoreError::storage(operation, domain, stream_id, self)
    }
}
