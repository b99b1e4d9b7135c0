//! Schema initializer: idempotent `CREATE TABLE IF NOT EXISTS` plus
//! supporting indexes for the four tables this crate owns.
//!
//! Grounded on `eventually-postgres/src/lib.rs`'s
//! `sqlx::migrate!("./migrations")` call for *which crate* owns schema
//! setup, but not its migration-history mechanism: schema migration
//! tooling is out of scope here, so this runs inline idempotent DDL
//! instead of maintaining a migrations directory and history table.

use eventlog_core::config::StoreConfig;
use sqlx::{Postgres, Transaction};

use crate::error::PgError;
use crate::pool::ConnectionProvider;

/// Creates the four tables and their indexes for `config.store_name`, if
/// they don't already exist.
pub async fn initialize(provider: &ConnectionProvider, config: &StoreConfig) -> Result<(), PgError> {
    let mut tx = provider.begin().await?;
    initialize_in_tx(&mut tx, config).await?;
    tx.commit().await?;
    Ok(())
}

async fn initialize_in_tx(tx: &mut Transaction<'_, Postgres>, config: &StoreConfig) -> Result<(), PgError> {
    let events = config.events_table();
    let streams = config.streams_table();
    let snapshots = config.snapshots_table();
    let segments = config.archive_segments_table();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {events} (
            global_position  BIGSERIAL PRIMARY KEY,
            stream_domain    VARCHAR(64)  NOT NULL,
            stream_id        VARCHAR(200) NOT NULL,
            stream_version   INTEGER      NOT NULL,
            stream_namespace VARCHAR(200) NOT NULL,
            event_type       VARCHAR(200) NOT NULL,
            data             BYTEA        NOT NULL,
            metadata         BYTEA,
            created_utc      TIMESTAMPTZ  NOT NULL,
            UNIQUE (stream_domain, stream_id, stream_version)
        )
        "#
    ))
    .execute(&mut **tx)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS {events}_stream_id_idx ON {events} (stream_id)"
    ))
    .execute(&mut **tx)
    .await?;
    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS {events}_namespace_idx ON {events} (stream_namespace)"
    ))
    .execute(&mut **tx)
    .await?;
    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS {events}_domain_idx ON {events} (stream_domain)"
    ))
    .execute(&mut **tx)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {streams} (
            domain                 VARCHAR(64)  NOT NULL,
            stream_id              VARCHAR(200) NOT NULL,
            last_version           INTEGER      NOT NULL,
            last_position          BIGINT       NOT NULL,
            archived_at            TIMESTAMPTZ,
            archive_cutoff_version INTEGER,
            retention_mode         SMALLINT     NOT NULL,
            is_deleted             BOOLEAN      NOT NULL DEFAULT FALSE,
            PRIMARY KEY (domain, stream_id)
        )
        "#
    ))
    .execute(&mut **tx)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS {streams}_retention_idx ON {streams} (retention_mode, is_deleted, archive_cutoff_version)"
    ))
    .execute(&mut **tx)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {snapshots} (
            stream_id      VARCHAR(200) PRIMARY KEY,
            stream_version INTEGER     NOT NULL,
            data           BYTEA       NOT NULL,
            created_utc    TIMESTAMPTZ NOT NULL
        )
        "#
    ))
    .execute(&mut **tx)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {segments} (
            segment_id       BIGSERIAL PRIMARY KEY,
            min_position     BIGINT       NOT NULL,
            max_position     BIGINT       NOT NULL,
            file_name        VARCHAR(255) NOT NULL,
            status           SMALLINT     NOT NULL,
            stream_namespace VARCHAR(200),
            UNIQUE (min_position, max_position)
        )
        "#
    ))
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_ddl_uses_configured_prefix() {
        let config = StoreConfig::new("orders", "/tmp").unwrap();
        assert_eq!(config.events_table(), "orders_events");
        assert_eq!(config.archive_segments_table(), "orders_archive_segments");
    }
}
