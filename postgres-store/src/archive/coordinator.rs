//! Archive coordinator: walks candidate streams and either archives with
//! pruning, archives preserving hot rows, or hard-deletes.
//!
//! Uses `sqlx::Transaction` the same way `store.rs`'s `append` does:
//! begin, several statements, commit or let `?` roll back on error.

use std::sync::Arc;

use eventlog_core::cancel::Cancel;
use eventlog_core::config::StoreConfig;
use eventlog_core::error::Error as CoreError;
use eventlog_core::event::Event;
use eventlog_core::retention::RetentionMode;
use eventlog_core::version::Version;
use sqlx::Row;

use crate::archive::catalog::SegmentCatalog;
use crate::archive::cold::ColdArchiveStore;
use crate::error::PgError;
use crate::pool::ConnectionProvider;

/// A stream selected for this `archive()` pass.
#[derive(Debug, Clone)]
struct Candidate {
    domain: String,
    stream_id: String,
    retention_mode: RetentionMode,
    cutoff: Option<Version>,
}

/// What happened to one candidate stream during an `archive()` pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// A new segment was written (or the stream was hard-deleted).
    Archived,
    /// Nothing to do: no events at or below the cutoff, or the cutoff
    /// range was already archived by a prior run (an internal segment
    /// overlap, never surfaced past this point).
    Skipped,
}

/// Tally returned by one `archive()` invocation.
#[derive(Debug, Clone, Default)]
pub struct ArchiveReport {
    pub archived: u32,
    pub skipped: u32,
    pub failed: u32,
}

/// Produces NDJSON segments for archivable streams and prunes, preserves,
/// or hard-deletes hot rows per their retention mode.
#[derive(Debug, Clone)]
pub struct ArchiveCoordinator {
    provider: ConnectionProvider,
    config: Arc<StoreConfig>,
    cold: ColdArchiveStore,
    catalog: SegmentCatalog,
}

impl ArchiveCoordinator {
    #[must_use]
    pub fn new(provider: ConnectionProvider, config: Arc<StoreConfig>, cold: ColdArchiveStore, catalog: SegmentCatalog) -> Self {
        ArchiveCoordinator {
            provider,
            config,
            cold,
            catalog,
        }
    }

    /// Runs one idempotent archival pass over every candidate stream,
    /// sequentially, logging and continuing past per-stream failures.
    #[cfg_attr(feature = "with-tracing", tracing::instrument(skip(self, cancel)))]
    pub async fn archive(&self, cancel: Cancel) -> Result<ArchiveReport, CoreError> {
        let candidates = self.enumerate_candidates().await?;
        let mut report = ArchiveReport::default();

        for candidate in candidates {
            if cancel.is_cancelled() {
                break;
            }

            let result = match candidate.retention_mode {
                RetentionMode::ColdArchivable => self.archive_and_prune(&candidate).await,
                RetentionMode::FullHistory => self.archive_preserving(&candidate).await,
                RetentionMode::HardDeletable => self.hard_delete(&candidate).await,
                RetentionMode::Default => continue,
            };

            match result {
                Ok(StreamOutcome::Archived) => {
                    report.archived += 1;
                    #[cfg(feature = "with-tracing")]
                    tracing::info!(domain = %candidate.domain, stream_id = %candidate.stream_id, "archived stream");
                }
                Ok(StreamOutcome::Skipped) => {
                    report.skipped += 1;
                    #[cfg(feature = "with-tracing")]
                    tracing::warn!(domain = %candidate.domain, stream_id = %candidate.stream_id, "skipped stream (overlap or empty range)");
                }
                Err(_err) => {
                    report.failed += 1;
                    #[cfg(feature = "with-tracing")]
                    tracing::warn!(domain = %candidate.domain, stream_id = %candidate.stream_id, error = %_err, "failed to archive stream, continuing");
                }
            }
        }

        Ok(report)
    }

    async fn enumerate_candidates(&self) -> Result<Vec<Candidate>, CoreError> {
        let table = self.config.streams_table();

        let rows = sqlx::query(&format!(
            r#"SELECT domain, stream_id, retention_mode, archive_cutoff_version
               FROM {table}
               WHERE (retention_mode IN (1, 2) AND archive_cutoff_version IS NOT NULL AND archive_cutoff_version > 0 AND is_deleted = FALSE)
                  OR (retention_mode = 3 AND is_deleted = TRUE)"#
        ))
        .fetch_all(self.provider.pool())
        .await
        .map_err(PgError::from)
        .map_err(|err| err.into_core("archive_enumerate", None, None))?;

        rows.into_iter()
            .map(|row| {
                let retention_raw: i16 = row
                    .try_get("retention_mode")
                    .map_err(|source| PgError::Column { name: "retention_mode", source })?;
                let cutoff_raw: Option<i32> = row
                    .try_get("archive_cutoff_version")
                    .map_err(|source| PgError::Column { name: "archive_cutoff_version", source })?;

                Ok(Candidate {
                    domain: row.try_get("domain").map_err(|source| PgError::Column { name: "domain", source })?,
                    stream_id: row
                        .try_get("stream_id")
                        .map_err(|source| PgError::Column { name: "stream_id", source })?,
                    retention_mode: RetentionMode::from_i16(retention_raw)
                        .ok_or_else(|| PgError::Corrupt(format!("unrecognized retention_mode {retention_raw}")))?,
                    cutoff: cutoff_raw.map(|v| v as Version),
                })
            })
            .collect::<Result<Vec<_>, PgError>>()
            .map_err(|err| err.into_core("archive_enumerate", None, None))
    }

    async fn events_up_to_version(&self, domain: &str, stream_id: &str, max_version: Version) -> Result<Vec<Event>, PgError> {
        let table = self.config.events_table();

        let rows = sqlx::query(&format!(
            "SELECT global_position, stream_domain, stream_id, stream_version, stream_namespace, event_type, data, metadata, created_utc
             FROM {table} WHERE stream_domain = $1 AND stream_id = $2 AND stream_version <= $3 ORDER BY global_position ASC"
        ))
        .bind(domain)
        .bind(stream_id)
        .bind(max_version as i32)
        .fetch_all(self.provider.pool())
        .await?;

        rows.into_iter().map(crate::store::row_to_event).collect()
    }

    async fn archive_and_prune(&self, candidate: &Candidate) -> Result<StreamOutcome, CoreError> {
        self.archive_range(candidate, true)
            .await
            .map_err(|err| err.into_core("archive_and_prune", candidate.domain.clone(), candidate.stream_id.clone()))
    }

    async fn archive_preserving(&self, candidate: &Candidate) -> Result<StreamOutcome, CoreError> {
        self.archive_range(candidate, false)
            .await
            .map_err(|err| err.into_core("archive_preserving", candidate.domain.clone(), candidate.stream_id.clone()))
    }

    async fn archive_range(&self, candidate: &Candidate, prune: bool) -> Result<StreamOutcome, PgError> {
        let Some(cutoff) = candidate.cutoff else {
            return Ok(StreamOutcome::Skipped);
        };

        let events = self
            .events_up_to_version(&candidate.domain, &candidate.stream_id, cutoff)
            .await?;

        if events.is_empty() {
            return Ok(StreamOutcome::Skipped);
        }

        let min_position = events.first().expect("checked non-empty above").global_position;
        let max_position = events.last().expect("checked non-empty above").global_position;
        let segment_namespace = events.first().expect("checked non-empty above").namespace.clone();

        let mut tx = self.provider.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        if self.catalog.find_overlap(&mut tx, min_position, max_position).await?.is_some() {
            tx.rollback().await?;
            return Ok(StreamOutcome::Skipped);
        }

        let final_path = self.cold.write_segment(&events, min_position, max_position).await.map_err(|err| {
            PgError::Corrupt(format!("failed to write segment file: {err}"))
        })?;
        let file_name = final_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PgError::Corrupt("segment path has no file name".to_owned()))?
            .to_owned();

        let namespace = (!segment_namespace.is_empty()).then_some(segment_namespace.as_str());

        let insert_result = self
            .catalog
            .insert_segment(&mut tx, min_position, max_position, &file_name, namespace)
            .await;

        if let Err(PgError::Database(err)) = &insert_result {
            if err.as_database_error().and_then(sqlx::error::DatabaseError::code).as_deref() == Some("23505") {
                tx.rollback().await?;
                return Ok(StreamOutcome::Skipped);
            }
        }
        insert_result?;

        if prune {
            let events_table = self.config.events_table();
            sqlx::query(&format!(
                "DELETE FROM {events_table} WHERE stream_domain = $1 AND stream_id = $2 AND global_position BETWEEN $3 AND $4"
            ))
            .bind(&candidate.domain)
            .bind(&candidate.stream_id)
            .bind(min_position)
            .bind(max_position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(StreamOutcome::Archived)
    }

    async fn hard_delete(&self, candidate: &Candidate) -> Result<StreamOutcome, CoreError> {
        self.hard_delete_inner(candidate)
            .await
            .map_err(|err| err.into_core("hard_delete", candidate.domain.clone(), candidate.stream_id.clone()))
    }

    async fn hard_delete_inner(&self, candidate: &Candidate) -> Result<StreamOutcome, PgError> {
        let events_table = self.config.events_table();
        let streams_table = self.config.streams_table();

        let mut tx = self.provider.begin().await?;

        sqlx::query(&format!("DELETE FROM {events_table} WHERE stream_domain = $1 AND stream_id = $2"))
            .bind(&candidate.domain)
            .bind(&candidate.stream_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(&format!("DELETE FROM {streams_table} WHERE domain = $1 AND stream_id = $2"))
            .bind(&candidate.domain)
            .bind(&candidate.stream_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(StreamOutcome::Archived)
    }
}
