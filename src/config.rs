//! Ambient configuration surface.
//!
//! Dependency-injection wiring and file/CLI-based config loading are out
//! of scope; this struct is the minimal programmatic configuration an
//! embedding application constructs directly, validated up front the way
//! a builder validates its inputs before handing back a usable store.

use std::path::PathBuf;

use crate::error::Error;
use crate::stream::validate_store_name;

/// Default page size used by `ReadAllForwards`-style paged queries when
/// the caller doesn't specify one.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Configuration for one logical event store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Prefixes every table name, so multiple logical stores can share a
    /// database.
    pub store_name: String,
    /// Directory the cold archive store writes NDJSON segment files to.
    pub archive_dir: PathBuf,
    /// Default page size for paged reads when the caller doesn't specify
    /// one explicitly.
    pub default_batch_size: usize,
}

impl StoreConfig {
    /// Builds a config, applying the store's identifier format rules.
    pub fn new(store_name: impl Into<String>, archive_dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let store_name = store_name.into();
        validate_store_name(&store_name)?;

        Ok(StoreConfig {
            store_name,
            archive_dir: archive_dir.into(),
            default_batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    #[must_use]
    pub fn with_default_batch_size(mut self, batch_size: usize) -> Self {
        self.default_batch_size = batch_size;
        self
    }

    /// The `events` table name for this store.
    #[must_use]
    pub fn events_table(&self) -> String {
        format!("{}_events", self.store_name)
    }

    /// The `streams` table name for this store.
    #[must_use]
    pub fn streams_table(&self) -> String {
        format!("{}_streams", self.store_name)
    }

    /// The `snapshots` table name for this store.
    #[must_use]
    pub fn snapshots_table(&self) -> String {
        format!("{}_snapshots", self.store_name)
    }

    /// The `archive_segments` table name for this store.
    #[must_use]
    pub fn archive_segments_table(&self) -> String {
        format!("{}_archive_segments", self.store_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_store_name() {
        assert!(StoreConfig::new("bad-name", "/tmp").is_err());
    }

    #[test]
    fn table_names_are_prefixed() {
        let config = StoreConfig::new("orders", "/tmp").unwrap();
        assert_eq!(config.events_table(), "orders_events");
        assert_eq!(config.streams_table(), "orders_streams");
        assert_eq!(config.snapshots_table(), "orders_snapshots");
        assert_eq!(config.archive_segments_table(), "orders_archive_segments");
    }
}
