//! Segment catalog: lists active archive segments, and is where the
//! archive coordinator's overlap check and segment insert happen.
//!
//! Same `sqlx::query` idiom as `store.rs`.

use std::sync::Arc;

use eventlog_core::config::StoreConfig;
use eventlog_core::error::Error as CoreError;
use eventlog_core::segment::{ArchiveSegment, SegmentStatus};
use eventlog_core::version::GlobalPosition;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row, Transaction};

use crate::error::PgError;
use crate::pool::ConnectionProvider;

/// Reads and writes the `archive_segments` table.
#[derive(Debug, Clone)]
pub struct SegmentCatalog {
    provider: ConnectionProvider,
    config: Arc<StoreConfig>,
}

impl SegmentCatalog {
    #[must_use]
    pub fn new(provider: ConnectionProvider, config: Arc<StoreConfig>) -> Self {
        SegmentCatalog { provider, config }
    }

    /// Returns every `Active` segment, ordered by `min_position`.
    ///
    /// This is a small, frequently-read set; callers may cache the result
    /// for the duration of one operation but must not cache it across
    /// operations, since the archiver may add segments at any time.
    pub async fn get_active_segments(&self) -> Result<Vec<ArchiveSegment>, CoreError> {
        let table = self.config.archive_segments_table();

        let rows = sqlx::query(&format!(
            "SELECT segment_id, min_position, max_position, file_name, status, stream_namespace
             FROM {table} WHERE status = $1 ORDER BY min_position ASC"
        ))
        .bind(SegmentStatus::Active.as_i16())
        .fetch_all(self.provider.pool())
        .await
        .map_err(PgError::from)
        .map_err(|err| err.into_core("get_active_segments", None, None))?;

        rows.into_iter()
            .map(row_to_segment)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| err.into_core("get_active_segments", None, None))
    }

    /// Returns the first segment (if any) whose range overlaps
    /// `[min_position, max_position]`, run inside the archival
    /// transaction so the check and the eventual insert are atomic.
    pub(crate) async fn find_overlap(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        min_position: GlobalPosition,
        max_position: GlobalPosition,
    ) -> Result<Option<ArchiveSegment>, PgError> {
        let table = self.config.archive_segments_table();

        let row = sqlx::query(&format!(
            "SELECT segment_id, min_position, max_position, file_name, status, stream_namespace
             FROM {table} WHERE min_position <= $1 AND max_position >= $2 LIMIT 1"
        ))
        .bind(max_position)
        .bind(min_position)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(row_to_segment).transpose()
    }

    /// Inserts a new `Active` segment row within `tx`.
    pub(crate) async fn insert_segment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        min_position: GlobalPosition,
        max_position: GlobalPosition,
        file_name: &str,
        stream_namespace: Option<&str>,
    ) -> Result<(), PgError> {
        let table = self.config.archive_segments_table();

        sqlx::query(&format!(
            r#"INSERT INTO {table} (min_position, max_position, file_name, status, stream_namespace)
               VALUES ($1, $2, $3, $4, $5)"#
        ))
        .bind(min_position)
        .bind(max_position)
        .bind(file_name)
        .bind(SegmentStatus::Active.as_i16())
        .bind(stream_namespace)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

fn row_to_segment(row: PgRow) -> Result<ArchiveSegment, PgError> {
    let status_raw: i16 = row.try_get("status").map_err(|source| PgError::Column { name: "status", source })?;
    let status =
        SegmentStatus::from_i16(status_raw).ok_or_else(|| PgError::Corrupt(format!("unrecognized segment status {status_raw}")))?;

    Ok(ArchiveSegment {
        segment_id: row.try_get("segment_id").map_err(|source| PgError::Column {
            name: "segment_id",
            source,
        })?,
        min_position: row.try_get("min_position").map_err(|source| PgError::Column {
            name: "min_position",
            source,
        })?,
        max_position: row.try_get("max_position").map_err(|source| PgError::Column {
            name: "max_position",
            source,
        })?,
        file_name: row.try_get("file_name").map_err(|source| PgError::Column {
            name: "file_name",
            source,
        })?,
        status,
        stream_namespace: row.try_get("stream_namespace").map_err(|source| PgError::Column {
            name: "stream_namespace",
            source,
        })?,
    })
}
