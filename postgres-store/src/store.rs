//! Event store: append with optimistic concurrency and global positions,
//! plus the two forward-reading operations.
//!
//! Grounded directly on `eventually-postgres/src/event.rs`'s
//! `Store::append`/`Store::stream`: a `sqlx::Transaction` guarding the
//! version check, a per-event insert loop, and row decoding through a
//! small `try_get` helper.

use std::sync::Arc;

use chrono::Utc;
use eventlog_core::cancel::Cancel;
use eventlog_core::config::StoreConfig;
use eventlog_core::error::Error as CoreError;
use eventlog_core::event::{Event, NewEvent};
use eventlog_core::retention::{RetentionMode, RetentionPolicyProvider};
use eventlog_core::stream::StreamHeader;
use eventlog_core::version::{ConflictError, ExpectedVersion, GlobalPosition, Version};
use futures::stream::{self, BoxStream, StreamExt};
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder, Row, Transaction};

use crate::error::PgError;
use crate::pool::ConnectionProvider;

/// The hot-tier append/read engine, parameterized by `store_name` through
/// its [`StoreConfig`].
#[derive(Debug, Clone)]
pub struct EventStore {
    provider: ConnectionProvider,
    config: Arc<StoreConfig>,
    retention: Arc<RetentionPolicyProvider>,
}

impl EventStore {
    /// Builds a store over `provider`'s connection pool, using `config`'s
    /// table names and `retention` to resolve a default
    /// [`RetentionMode`] for streams created with none specified.
    #[must_use]
    pub fn new(provider: ConnectionProvider, config: Arc<StoreConfig>, retention: Arc<RetentionPolicyProvider>) -> Self {
        EventStore {
            provider,
            config,
            retention,
        }
    }

    /// Appends `events` to `(domain, stream_id)`, failing with
    /// [`CoreError::ConcurrencyConflict`] unless the stream's current
    /// version matches `expected_version`.
    ///
    /// Appending zero events is a no-op: the stream's current version is
    /// returned without touching the database.
    #[cfg_attr(feature = "with-tracing", tracing::instrument(skip(self, events), fields(domain, stream_id)))]
    pub async fn append(
        &self,
        domain: &str,
        stream_id: &str,
        expected_version: ExpectedVersion,
        events: &[NewEvent],
        retention_mode: Option<RetentionMode>,
    ) -> Result<Version, CoreError> {
        eventlog_core::stream::validate_domain(domain)?;
        eventlog_core::stream::validate_stream_id(stream_id)?;

        if events.is_empty() {
            return Ok(self
                .get_stream_header(domain, stream_id)
                .await?
                .map_or(0, |header| header.last_version));
        }

        let mut tx = self
            .provider
            .begin()
            .await
            .map_err(|err| err.into_core("append", domain.to_owned(), stream_id.to_owned()))?;

        let existing = self
            .lock_stream_header(&mut tx, domain, stream_id)
            .await
            .map_err(|err| err.into_core("append", domain.to_owned(), stream_id.to_owned()))?;

        if let Some(header) = &existing {
            if header.is_deleted {
                return Err(CoreError::StreamDeleted {
                    domain: domain.to_owned(),
                    stream_id: stream_id.to_owned(),
                });
            }
        }

        let last_version = existing.as_ref().map_or(0, |header| header.last_version);
        if expected_version.0 != last_version {
            return Err(CoreError::ConcurrencyConflict(ConflictError {
                expected: expected_version.0,
                actual: last_version,
            }));
        }

        let events_table = self.config.events_table();
        let mut last_position: GlobalPosition = existing.as_ref().map_or(0, |header| header.last_position);
        let mut new_version = last_version;

        for event in events {
            eventlog_core::stream::validate_namespace(&event.namespace)?;
            eventlog_core::stream::validate_event_type(&event.event_type)?;

            new_version += 1;
            let created_utc = Utc::now();

            let row = sqlx::query(&format!(
                r#"INSERT INTO {events_table}
                   (stream_domain, stream_id, stream_version, stream_namespace, event_type, data, metadata, created_utc)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                   RETURNING global_position"#
            ))
            .bind(domain)
            .bind(stream_id)
            .bind(new_version as i32)
            .bind(&event.namespace)
            .bind(&event.event_type)
            .bind(&event.data)
            .bind(event.metadata.as_deref())
            .bind(created_utc)
            .fetch_one(&mut *tx)
            .await
            .map_err(PgError::from)
            .map_err(|err| err.into_core("append", domain.to_owned(), stream_id.to_owned()))?;

            last_position = row
                .try_get::<i64, _>(0)
                .map_err(|source| PgError::Column {
                    name: "global_position",
                    source,
                })
                .map_err(|err| err.into_core("append", domain.to_owned(), stream_id.to_owned()))?;
        }

        let streams_table = self.config.streams_table();

        if existing.is_some() {
            sqlx::query(&format!(
                "UPDATE {streams_table} SET last_version = $1, last_position = $2 WHERE domain = $3 AND stream_id = $4"
            ))
            .bind(new_version as i32)
            .bind(last_position)
            .bind(domain)
            .bind(stream_id)
            .execute(&mut *tx)
            .await
            .map_err(PgError::from)
            .map_err(|err| err.into_core("append", domain.to_owned(), stream_id.to_owned()))?;
        } else {
            let mode = retention_mode.unwrap_or_else(|| self.retention.resolve(domain));

            sqlx::query(&format!(
                r#"INSERT INTO {streams_table}
                   (domain, stream_id, last_version, last_position, retention_mode, is_deleted)
                   VALUES ($1, $2, $3, $4, $5, FALSE)"#
            ))
            .bind(domain)
            .bind(stream_id)
            .bind(new_version as i32)
            .bind(last_position)
            .bind(mode.as_i16())
            .execute(&mut *tx)
            .await
            .map_err(PgError::from)
            .map_err(|err| err.into_core("append", domain.to_owned(), stream_id.to_owned()))?;
        }

        tx.commit()
            .await
            .map_err(PgError::from)
            .map_err(|err| err.into_core("append", domain.to_owned(), stream_id.to_owned()))?;

        Ok(new_version)
    }

    async fn lock_stream_header(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        domain: &str,
        stream_id: &str,
    ) -> Result<Option<StreamHeader>, PgError> {
        let streams_table = self.config.streams_table();

        let row = sqlx::query(&format!(
            "SELECT domain, stream_id, last_version, last_position, retention_mode, archive_cutoff_version, is_deleted, archived_at
             FROM {streams_table} WHERE domain = $1 AND stream_id = $2 FOR UPDATE"
        ))
        .bind(domain)
        .bind(stream_id)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(row_to_header).transpose()
    }

    /// Returns the stream's header, or `None` if it has never been
    /// appended to.
    #[cfg_attr(feature = "with-tracing", tracing::instrument(skip(self), fields(domain, stream_id)))]
    pub async fn get_stream_header(&self, domain: &str, stream_id: &str) -> Result<Option<StreamHeader>, CoreError> {
        let streams_table = self.config.streams_table();

        let row = sqlx::query(&format!(
            "SELECT domain, stream_id, last_version, last_position, retention_mode, archive_cutoff_version, is_deleted, archived_at
             FROM {streams_table} WHERE domain = $1 AND stream_id = $2"
        ))
        .bind(domain)
        .bind(stream_id)
        .fetch_optional(self.provider.pool())
        .await
        .map_err(PgError::from)
        .map_err(|err| err.into_core("get_stream_header", domain.to_owned(), stream_id.to_owned()))?;

        row.map(row_to_header)
            .transpose()
            .map_err(|err| err.into_core("get_stream_header", domain.to_owned(), stream_id.to_owned()))
    }

    /// Reads up to `max_count` events from `(domain, stream_id)` starting
    /// at `from_version_inclusive`, optionally filtered by `namespace`.
    /// Does not consult cold storage.
    ///
    /// Fails with [`CoreError::StreamDeleted`] if the stream's header is
    /// marked deleted, the same as `append` does.
    #[cfg_attr(feature = "with-tracing", tracing::instrument(skip(self), fields(domain, stream_id)))]
    pub async fn read_stream(
        &self,
        domain: &str,
        stream_id: &str,
        namespace: Option<&str>,
        from_version_inclusive: Version,
        max_count: i64,
    ) -> Result<Vec<Event>, CoreError> {
        if let Some(header) = self.get_stream_header(domain, stream_id).await? {
            if header.is_deleted {
                return Err(CoreError::StreamDeleted {
                    domain: domain.to_owned(),
                    stream_id: stream_id.to_owned(),
                });
            }
        }

        let events_table = self.config.events_table();

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT global_position, stream_domain, stream_id, stream_version, stream_namespace, event_type, data, metadata, created_utc
             FROM {events_table} WHERE stream_domain = "
        ));
        builder.push_bind(domain.to_owned());
        builder.push(" AND stream_id = ");
        builder.push_bind(stream_id.to_owned());
        builder.push(" AND stream_version >= ");
        builder.push_bind(from_version_inclusive as i32);

        if let Some(namespace) = namespace {
            builder.push(" AND stream_namespace = ");
            builder.push_bind(namespace.to_owned());
        }

        builder.push(" ORDER BY stream_version ASC LIMIT ");
        builder.push_bind(max_count);

        let rows = builder
            .build()
            .fetch_all(self.provider.pool())
            .await
            .map_err(PgError::from)
            .map_err(|err| err.into_core("read_stream", domain.to_owned(), stream_id.to_owned()))?;

        rows.into_iter()
            .map(row_to_event)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| err.into_core("read_stream", domain.to_owned(), stream_id.to_owned()))
    }

    /// Yields events with `GlobalPosition > from_position_exclusive`,
    /// optionally filtered by `domain`/`namespace`, paged internally in
    /// `batch_size`-sized chunks, ordered by `GlobalPosition` ascending.
    #[must_use]
    pub fn read_all_forwards<'a>(
        &'a self,
        domain: Option<String>,
        namespace: Option<String>,
        from_position_exclusive: GlobalPosition,
        batch_size: i64,
        cancel: Cancel,
    ) -> BoxStream<'a, Result<Event, CoreError>> {
        struct PageState {
            cursor: GlobalPosition,
            buffer: std::vec::IntoIter<Event>,
            done: bool,
        }

        let initial = PageState {
            cursor: from_position_exclusive,
            buffer: Vec::new().into_iter(),
            done: false,
        };

        stream::try_unfold(initial, move |mut state| {
            let domain = domain.clone();
            let namespace = namespace.clone();
            let cancel = cancel.clone();

            async move {
                loop {
                    if let Some(event) = state.buffer.next() {
                        return Ok(Some((event, state)));
                    }
                    if state.done || cancel.is_cancelled() {
                        return Ok(None);
                    }

                    let page = self
                        .fetch_forwards_page(domain.as_deref(), namespace.as_deref(), state.cursor, batch_size)
                        .await
                        .map_err(|err| err.into_core("read_all_forwards", domain.clone(), None))?;

                    if page.len() < batch_size as usize {
                        state.done = true;
                    }
                    if page.is_empty() {
                        continue;
                    }

                    state.cursor = page.last().expect("checked non-empty above").global_position;
                    state.buffer = page.into_iter();
                }
            }
        })
        .boxed()
    }

    async fn fetch_forwards_page(
        &self,
        domain: Option<&str>,
        namespace: Option<&str>,
        from_position_exclusive: GlobalPosition,
        batch_size: i64,
    ) -> Result<Vec<Event>, PgError> {
        let events_table = self.config.events_table();

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT global_position, stream_domain, stream_id, stream_version, stream_namespace, event_type, data, metadata, created_utc
             FROM {events_table} WHERE global_position > "
        ));
        builder.push_bind(from_position_exclusive);

        if let Some(domain) = domain {
            builder.push(" AND stream_domain = ");
            builder.push_bind(domain.to_owned());
        }
        if let Some(namespace) = namespace {
            builder.push(" AND stream_namespace = ");
            builder.push_bind(namespace.to_owned());
        }

        builder.push(" ORDER BY global_position ASC LIMIT ");
        builder.push_bind(batch_size);

        let rows = builder.build().fetch_all(self.provider.pool()).await?;
        rows.into_iter().map(row_to_event).collect()
    }
}

pub(crate) fn row_to_event(row: PgRow) -> Result<Event, PgError> {
    let version: i32 = try_get(&row, "stream_version")?;
    Ok(Event {
        global_position: try_get(&row, "global_position")?,
        domain: try_get(&row, "stream_domain")?,
        stream_id: try_get(&row, "stream_id")?,
        version: version as Version,
        namespace: try_get(&row, "stream_namespace")?,
        event_type: try_get(&row, "event_type")?,
        data: try_get(&row, "data")?,
        metadata: try_get(&row, "metadata")?,
        created_utc: try_get(&row, "created_utc")?,
    })
}

fn row_to_header(row: PgRow) -> Result<StreamHeader, PgError> {
    let last_version: i32 = try_get(&row, "last_version")?;
    let retention_raw: i16 = try_get(&row, "retention_mode")?;
    let cutoff_raw: Option<i32> = try_get(&row, "archive_cutoff_version")?;

    let retention_mode = RetentionMode::from_i16(retention_raw)
        .ok_or_else(|| PgError::Corrupt(format!("unrecognized retention_mode {retention_raw}")))?;

    Ok(StreamHeader {
        domain: try_get(&row, "domain")?,
        stream_id: try_get(&row, "stream_id")?,
        last_version: last_version as Version,
        last_position: try_get(&row, "last_position")?,
        retention_mode,
        archive_cutoff_version: cutoff_raw.map(|v| v as Version),
        is_deleted: try_get(&row, "is_deleted")?,
        archived_at: try_get(&row, "archived_at")?,
    })
}

fn try_get<'r, T>(row: &'r PgRow, name: &'static str) -> Result<T, PgError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name).map_err(|source| PgError::Column { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_tables_are_addressable() {
        let config = StoreConfig::new("orders", "/tmp").unwrap();
        assert_eq!(config.events_table(), "orders_events");
    }
}
