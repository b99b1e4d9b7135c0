//! Connection provider: hands out database sessions, abstracting the one
//! dialect this crate implements.
//!
//! This crate provides the Postgres adapter, grounded on
//! `eventually-postgres/src/event.rs`'s direct use of `sqlx::PgPool` as
//! the connection source threaded through every component.

use std::time::Duration;

use sqlx::postgres::{PgPoolOptions, Postgres};
use sqlx::{Pool, Transaction};

use crate::error::PgError;

/// Wraps a [`sqlx::PgPool`], the handle every other component in this
/// crate is constructed from.
#[derive(Debug, Clone)]
pub struct ConnectionProvider {
    pool: Pool<Postgres>,
}

impl ConnectionProvider {
    /// Connects to `database_url`, eagerly establishing at least one
    /// connection so misconfiguration surfaces immediately rather than on
    /// first use.
    pub async fn connect(database_url: &str) -> Result<Self, PgError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;

        Ok(ConnectionProvider { pool })
    }

    /// Wraps an already-constructed pool, for callers (tests, embedders
    /// with their own pool lifecycle) that manage connection options
    /// themselves.
    #[must_use]
    pub fn from_pool(pool: Pool<Postgres>) -> Self {
        ConnectionProvider { pool }
    }

    /// The underlying pool, for components that need to issue their own
    /// queries.
    #[must_use]
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    /// Begins a new transaction.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, PgError> {
        self.pool.begin().await.map_err(PgError::from)
    }
}
