//! Database Connections
//!
//! The role core never owns connections. It asks a [`ConnectionProvider`]
//! for the connection registered under a database name and uses it to
//! prepare statements. Pool lifetime belongs to the provider.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

mod pool;
mod registry;

pub use pool::SqlxConnection;
pub use registry::ConnectionRegistry;

/// Outcome of a failed prepare
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// No session could be obtained (unreachable host, pool timeout, bad URL)
    #[error("connection unavailable: {0}")]
    Unavailable(String),

    /// The database rejected the statement
    #[error("{0}")]
    Prepare(String),
}

/// A live prepared statement.
///
/// Whatever the connection holds for it is released by [`close`](Self::close)
/// or, failing that, on drop.
pub struct PreparedStatement {
    columns: usize,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl PreparedStatement {
    pub fn new(columns: usize) -> Self {
        Self {
            columns,
            release: None,
        }
    }

    /// Run `release` when the handle is closed or dropped
    pub fn on_release<F>(mut self, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.release = Some(Box::new(release));
        self
    }

    /// Number of result columns the statement describes
    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn close(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for PreparedStatement {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for PreparedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedStatement")
            .field("columns", &self.columns)
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// A pooled session able to prepare statements without executing them.
#[async_trait]
pub trait DatabaseConnection: Send + Sync {
    async fn prepare(&self, statement: &str) -> Result<PreparedStatement, ConnectionError>;

    /// Driver name for logs
    fn kind(&self) -> &str;

    /// Release pooled sessions. Called once at shutdown.
    async fn close(&self) {}
}

/// Resolves a database name to a usable connection.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn resolve(&self, db_name: &str) -> Option<Arc<dyn DatabaseConnection>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_close_releases_once() {
        let released = Arc::new(AtomicU32::new(0));
        let counter = released.clone();
        let stmt = PreparedStatement::new(1).on_release(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        stmt.close();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases() {
        let released = Arc::new(AtomicU32::new(0));
        let counter = released.clone();
        {
            let _stmt = PreparedStatement::new(0).on_release(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
