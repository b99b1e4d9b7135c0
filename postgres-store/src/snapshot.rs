//! Snapshot store: upsert-by-`stream_id`, get-latest.
//!
//! Follows the `sqlx::query` + manual `try_get` idiom `store.rs`
//! established, since there's no existing snapshot table to model this
//! one on directly.

use std::sync::Arc;

use eventlog_core::config::StoreConfig;
use eventlog_core::error::Error as CoreError;
use eventlog_core::snapshot::Snapshot;
use eventlog_core::version::Version;
use sqlx::Row;

use crate::error::PgError;
use crate::pool::ConnectionProvider;

/// Key/value latest-per-stream snapshot store.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    provider: ConnectionProvider,
    config: Arc<StoreConfig>,
}

impl SnapshotStore {
    #[must_use]
    pub fn new(provider: ConnectionProvider, config: Arc<StoreConfig>) -> Self {
        SnapshotStore { provider, config }
    }

    /// Upserts `snapshot`, keyed by `stream_id` alone. A stream id shared
    /// across domains would collide on the same snapshot row; preserved
    /// as a known tradeoff rather than widened to `(domain, stream_id)`.
    #[cfg_attr(feature = "with-tracing", tracing::instrument(skip(self, snapshot), fields(stream_id = %snapshot.stream_id)))]
    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), CoreError> {
        let table = self.config.snapshots_table();

        sqlx::query(&format!(
            r#"INSERT INTO {table} (stream_id, stream_version, data, created_utc)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (stream_id) DO UPDATE
               SET stream_version = EXCLUDED.stream_version,
                   data = EXCLUDED.data,
                   created_utc = EXCLUDED.created_utc"#
        ))
        .bind(&snapshot.stream_id)
        .bind(snapshot.stream_version as i32)
        .bind(&snapshot.data)
        .bind(snapshot.created_utc)
        .execute(self.provider.pool())
        .await
        .map_err(PgError::from)
        .map_err(|err| err.into_core("snapshot_save", None, snapshot.stream_id.clone()))?;

        Ok(())
    }

    /// Returns the latest snapshot for `stream_id`, if any.
    #[cfg_attr(feature = "with-tracing", tracing::instrument(skip(self)))]
    pub async fn get_latest(&self, stream_id: &str) -> Result<Option<Snapshot>, CoreError> {
        let table = self.config.snapshots_table();

        let row = sqlx::query(&format!(
            "SELECT stream_id, stream_version, data, created_utc FROM {table} WHERE stream_id = $1"
        ))
        .bind(stream_id)
        .fetch_optional(self.provider.pool())
        .await
        .map_err(PgError::from)
        .map_err(|err| err.into_core("snapshot_get_latest", None, stream_id.to_owned()))?;

        row.map(|row| {
            let version: i32 = row
                .try_get("stream_version")
                .map_err(|source| PgError::Column {
                    name: "stream_version",
                    source,
                })?;

            Ok::<_, PgError>(Snapshot {
                stream_id: row.try_get("stream_id").map_err(|source| PgError::Column {
                    name: "stream_id",
                    source,
                })?,
                stream_version: version as Version,
                data: row.try_get("data").map_err(|source| PgError::Column { name: "data", source })?,
                created_utc: row
                    .try_get("created_utc")
                    .map_err(|source| PgError::Column {
                        name: "created_utc",
                        source,
                    })?,
            })
        })
        .transpose()
        .map_err(|err| err.into_core("snapshot_get_latest", None, stream_id.to_owned()))
    }
}
