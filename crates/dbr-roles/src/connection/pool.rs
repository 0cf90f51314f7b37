//! sqlx-backed connections
//!
//! The driver is picked from the URL scheme. Pools are created lazily so a
//! database that is down at startup only fails the roles that target it.

use async_trait::async_trait;
use dbr_config::DatabaseConfig;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Executor, Statement};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use super::{ConnectionError, DatabaseConnection, PreparedStatement};

/// A lazily connected pool for one of the supported drivers.
#[derive(Debug, Clone)]
pub enum SqlxConnection {
    Postgres(PgPool),
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

impl SqlxConnection {
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, ConnectionError> {
        let url = config.url.trim();
        let acquire_timeout = Duration::from_secs(config.acquire_timeout_secs);

        // Statement caching is off so every prepare is checked by the database
        let connection = if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            let options = PgConnectOptions::from_str(url)
                .map_err(|e| ConnectionError::Unavailable(e.to_string()))?
                .statement_cache_capacity(0);
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(acquire_timeout)
                .connect_lazy_with(options);
            Self::Postgres(pool)
        } else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            let options = MySqlConnectOptions::from_str(url)
                .map_err(|e| ConnectionError::Unavailable(e.to_string()))?
                .statement_cache_capacity(0);
            let pool = MySqlPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(acquire_timeout)
                .connect_lazy_with(options);
            Self::MySql(pool)
        } else if url.starts_with("sqlite:") {
            let options = SqliteConnectOptions::from_str(url)
                .map_err(|e| ConnectionError::Unavailable(e.to_string()))?
                .statement_cache_capacity(0);
            let pool = SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(acquire_timeout)
                .connect_lazy_with(options);
            Self::Sqlite(pool)
        } else {
            return Err(ConnectionError::Unavailable(format!(
                "unsupported database URL scheme: {}",
                redact(url)
            )));
        };

        Ok(connection)
    }
}

/// Keep only the scheme so credentials never reach logs or responses
fn redact(url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, _)) => format!("{}://…", scheme),
        None => "<unparseable>".to_string(),
    }
}

/// Failures that mean no session was obtained, as opposed to the database
/// refusing the statement.
fn classify(e: &sqlx::Error) -> ConnectionError {
    match e {
        sqlx::Error::Database(db) => ConnectionError::Prepare(db.message().to_string()),
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Configuration(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => ConnectionError::Unavailable(e.to_string()),
        other => ConnectionError::Prepare(other.to_string()),
    }
}

// Acquire a session, prepare without executing and hand the session to the
// returned handle so it goes back to the pool when the handle is closed.
// `then` runs on the session after a successful prepare, before it is handed
// over.
macro_rules! prepare_on {
    ($pool:expr, $statement:expr $(, then $cleanup:literal)?) => {{
        let mut conn = $pool
            .acquire()
            .await
            .map_err(|e| ConnectionError::Unavailable(e.to_string()))?;
        let columns = (&mut *conn)
            .prepare($statement)
            .await
            .map_err(|e| classify(&e))?
            .columns()
            .len();
        $(
            (&mut *conn)
                .execute($cleanup)
                .await
                .map_err(|e| ConnectionError::Unavailable(e.to_string()))?;
        )?
        Ok(PreparedStatement::new(columns).on_release(move || drop(conn)))
    }};
}

#[async_trait]
impl DatabaseConnection for SqlxConnection {
    async fn prepare(&self, statement: &str) -> Result<PreparedStatement, ConnectionError> {
        debug!(kind = self.kind(), "Preparing statement");
        match self {
            // Postgres keeps a named statement on the session even uncached
            Self::Postgres(pool) => prepare_on!(pool, statement, then "DEALLOCATE ALL"),
            Self::MySql(pool) => prepare_on!(pool, statement),
            Self::Sqlite(pool) => prepare_on!(pool, statement),
        }
    }

    fn kind(&self) -> &str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::MySql(_) => "mysql",
            Self::Sqlite(_) => "sqlite",
        }
    }

    async fn close(&self) {
        match self {
            Self::Postgres(pool) => pool.close().await,
            Self::MySql(pool) => pool.close().await,
            Self::Sqlite(pool) => pool.close().await,
        }
    }
}
