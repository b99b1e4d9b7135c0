//! Cutoff advancer: the only monotonic gate on what the archive
//! coordinator may evict.
//!
//! Follows `store.rs`'s one-parameterized-query-per-operation idiom.

use std::sync::Arc;

use eventlog_core::config::StoreConfig;
use eventlog_core::error::Error as CoreError;
use eventlog_core::version::Version;

use crate::error::PgError;
use crate::pool::ConnectionProvider;

/// Advances `ArchiveCutoffVersion` for a stream, never letting it
/// regress.
#[derive(Debug, Clone)]
pub struct CutoffAdvancer {
    provider: ConnectionProvider,
    config: Arc<StoreConfig>,
}

impl CutoffAdvancer {
    #[must_use]
    pub fn new(provider: ConnectionProvider, config: Arc<StoreConfig>) -> Self {
        CutoffAdvancer { provider, config }
    }

    /// Sets `archive_cutoff_version = new_cutoff` for `(domain,
    /// stream_id)` only if it is currently `NULL` or strictly less than
    /// `new_cutoff`. Returns `true` iff a row was updated.
    ///
    /// TODO: once segment pruning is added, this must also refuse to
    /// advance past the last archived segment's max version.
    #[cfg_attr(feature = "with-tracing", tracing::instrument(skip(self), fields(domain, stream_id)))]
    pub async fn try_advance(&self, domain: &str, stream_id: &str, new_cutoff: Version) -> Result<bool, CoreError> {
        let table = self.config.streams_table();

        let result = sqlx::query(&format!(
            r#"UPDATE {table}
               SET archive_cutoff_version = $1
               WHERE domain = $2 AND stream_id = $3
                 AND (archive_cutoff_version IS NULL OR archive_cutoff_version < $1)"#
        ))
        .bind(new_cutoff as i32)
        .bind(domain)
        .bind(stream_id)
        .execute(self.provider.pool())
        .await
        .map_err(PgError::from)
        .map_err(|err| err.into_core("cutoff_try_advance", domain.to_owned(), stream_id.to_owned()))?;

        Ok(result.rows_affected() > 0)
    }
}
