//! Stream headers and the identifier format rules behind
//! `Error::Validation`.

use chrono::{DateTime, Utc};

use crate::error::Error;
use crate::retention::RetentionMode;
use crate::version::{GlobalPosition, Version};

/// Maximum length, in bytes, of a `Domain` value.
pub const MAX_DOMAIN_LEN: usize = 64;
/// Maximum length, in bytes, of a `StreamId` value.
pub const MAX_STREAM_ID_LEN: usize = 200;
/// Maximum length, in bytes, of a `Namespace` value.
pub const MAX_NAMESPACE_LEN: usize = 200;
/// Maximum length, in bytes, of an `EventType` value.
pub const MAX_EVENT_TYPE_LEN: usize = 200;

/// Validates a `Domain` value's length.
pub fn validate_domain(domain: &str) -> Result<(), Error> {
    if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
        return Err(Error::Validation(format!(
            "domain must be 1..={MAX_DOMAIN_LEN} bytes, got {}",
            domain.len()
        )));
    }
    Ok(())
}

/// Validates a `StreamId` value's length.
pub fn validate_stream_id(stream_id: &str) -> Result<(), Error> {
    if stream_id.is_empty() || stream_id.len() > MAX_STREAM_ID_LEN {
        return Err(Error::Validation(format!(
            "stream_id must be 1..={MAX_STREAM_ID_LEN} bytes, got {}",
            stream_id.len()
        )));
    }
    Ok(())
}

/// Validates a `Namespace` value. Namespaces are non-null but may be
/// empty.
pub fn validate_namespace(namespace: &str) -> Result<(), Error> {
    if namespace.len() > MAX_NAMESPACE_LEN {
        return Err(Error::Validation(format!(
            "namespace must be <={MAX_NAMESPACE_LEN} bytes, got {}",
            namespace.len()
        )));
    }
    Ok(())
}

/// Validates an `EventType` value.
pub fn validate_event_type(event_type: &str) -> Result<(), Error> {
    if event_type.is_empty() || event_type.len() > MAX_EVENT_TYPE_LEN {
        return Err(Error::Validation(format!(
            "event_type must be 1..={MAX_EVENT_TYPE_LEN} bytes, got {}",
            event_type.len()
        )));
    }
    Ok(())
}

/// A logical store name prefixes every table name, so several logical
/// stores may share a database. Alphanumeric and underscores only, at
/// most 63 bytes (the lowest common denominator across SQL dialects'
/// identifier limits).
pub fn validate_store_name(name: &str) -> Result<(), Error> {
    let is_valid = !name.is_empty()
        && name.len() <= 63
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.chars().next().is_some_and(|c| !c.is_ascii_digit());

    if !is_valid {
        return Err(Error::Validation(format!(
            "store name '{name}' must be alphanumeric/underscore, <=63 bytes, not digit-led"
        )));
    }
    Ok(())
}

/// One per `(Domain, StreamId)`. Created on first append, mutated by
/// subsequent appends and by the archive coordinator, destroyed only by
/// hard-delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// The stream's domain.
    pub domain: String,
    /// The stream's id, unique within `domain`.
    pub stream_id: String,
    /// The highest event `Version` recorded for this stream.
    pub last_version: Version,
    /// The `GlobalPosition` of the most recently appended event.
    pub last_position: GlobalPosition,
    /// The stream's retention behavior.
    pub retention_mode: RetentionMode,
    /// The largest version the archive coordinator may archive/evict.
    /// Monotonically non-decreasing once set.
    pub archive_cutoff_version: Option<Version>,
    /// Set by hard-delete; archival treats this as a hard-delete
    /// candidate once `retention_mode == HardDeletable`.
    pub is_deleted: bool,
    /// When the stream was archived, if ever.
    pub archived_at: Option<DateTime<Utc>>,
}

impl StreamHeader {
    /// A fresh header for a brand-new stream, as created on first append.
    #[must_use]
    pub fn new(domain: impl Into<String>, stream_id: impl Into<String>, retention_mode: RetentionMode) -> Self {
        StreamHeader {
            domain: domain.into(),
            stream_id: stream_id.into(),
            last_version: 0,
            last_position: 0,
            retention_mode,
            archive_cutoff_version: None,
            is_deleted: false,
            archived_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_oversized_domain() {
        let too_long = "d".repeat(MAX_DOMAIN_LEN + 1);
        assert!(validate_domain(&too_long).is_err());
        assert!(validate_domain("orders").is_ok());
    }

    #[test]
    fn empty_namespace_is_allowed() {
        assert!(validate_namespace("").is_ok());
    }

    #[test]
    fn store_name_must_be_alphanumeric_and_not_digit_led() {
        assert!(validate_store_name("orders_v1").is_ok());
        assert!(validate_store_name("1orders").is_err());
        assert!(validate_store_name("orders-v1").is_err());
        assert!(validate_store_name("").is_err());
    }
}
