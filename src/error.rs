//! Error kinds surfaced to callers of the event store.
//!
//! `SegmentOverlap` is deliberately not a variant here: it is an internal
//! signal inside the archive coordinator, caught and converted into "skip
//! this stream" before it could ever reach a caller.

use crate::version::ConflictError;

/// Errors surfaced by the public event-store API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An append observed a different stream version than expected.
    #[error("concurrency conflict on stream: {0}")]
    ConcurrencyConflict(#[from] ConflictError),

    /// The targeted stream's header has `is_deleted = true`.
    #[error("stream '{domain}/{stream_id}' has been deleted")]
    StreamDeleted {
        /// The stream's domain.
        domain: String,
        /// The stream's id.
        stream_id: String,
    },

    /// A database or filesystem fault. The failing operation and the
    /// stream it was operating on (when known) are carried for context.
    #[error("storage error during {operation} (domain={domain:?}, stream_id={stream_id:?}): {source}")]
    Storage {
        /// Name of the operation that failed, e.g. `"append"`.
        operation: &'static str,
        /// The domain involved, if any.
        domain: Option<String>,
        /// The stream id involved, if any.
        stream_id: Option<String>,
        /// The underlying fault.
        #[source]
        source: anyhow::Error,
    },

    /// A store name or identifier failed a format rule.
    #[error("validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Constructs a [`Error::Storage`] variant with full context.
    pub fn storage(
        operation: &'static str,
        domain: impl Into<Option<String>>,
        stream_id: impl Into<Option<String>>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Error::Storage {
            operation,
            domain: domain.into(),
            stream_id: stream_id.into(),
            source: source.into(),
        }
    }
}

/// Result alias using this crate's [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
