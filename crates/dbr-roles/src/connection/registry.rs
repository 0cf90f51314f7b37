//! Connection Registry
//!
//! Named connections shared across requests. Registration and removal are
//! safe while validations are running; a resolved connection stays alive
//! for as long as the caller holds it.

use async_trait::async_trait;
use dashmap::DashMap;
use dbr_config::DatabaseConfig;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use super::{ConnectionError, ConnectionProvider, DatabaseConnection, SqlxConnection};

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<String, Arc<dyn DatabaseConnection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build lazy sqlx pools for every `[databases.<name>]` entry
    pub fn from_config(databases: &BTreeMap<String, DatabaseConfig>) -> Result<Self, ConnectionError> {
        let registry = Self::new();
        for (name, config) in databases {
            let connection = SqlxConnection::connect_lazy(config).map_err(|e| match e {
                ConnectionError::Unavailable(reason) => {
                    ConnectionError::Unavailable(format!("database '{}': {}", name, reason))
                }
                other => other,
            })?;
            registry.register(name.clone(), Arc::new(connection));
        }
        Ok(registry)
    }

    /// Add or replace the connection for `name`, returning the previous one
    pub fn register(
        &self,
        name: impl Into<String>,
        connection: Arc<dyn DatabaseConnection>,
    ) -> Option<Arc<dyn DatabaseConnection>> {
        let name = name.into();
        info!(db_name = %name, kind = connection.kind(), "Registered database connection");
        self.connections.insert(name, connection)
    }

    pub fn remove(&self, name: &str) -> Option<Arc<dyn DatabaseConnection>> {
        self.connections.remove(name).map(|(_, connection)| connection)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.connections.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub async fn close_all(&self) {
        // Clone out first so no shard lock is held across an await
        let connections: Vec<Arc<dyn DatabaseConnection>> =
            self.connections.iter().map(|e| e.value().clone()).collect();
        for connection in connections {
            connection.close().await;
        }
    }
}

#[async_trait]
impl ConnectionProvider for ConnectionRegistry {
    async fn resolve(&self, db_name: &str) -> Option<Arc<dyn DatabaseConnection>> {
        self.connections.get(db_name).map(|e| e.value().clone())
    }
}
