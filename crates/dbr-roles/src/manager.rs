//! Role Manager
//!
//! Entry point for role operations. A role is only written after its
//! template has been validated against the database it names; a failed
//! create leaves whatever was stored before untouched.

use std::sync::Arc;
use tracing::{debug, info};

use crate::connection::ConnectionProvider;
use crate::entity::{Role, RoleName, WriteRoleRequest};
use crate::error::{Result, RolesError};
use crate::store::RoleStore;
use crate::validator::TemplateValidator;

#[derive(Clone)]
pub struct RoleManager {
    store: RoleStore,
    connections: Arc<dyn ConnectionProvider>,
    validator: TemplateValidator,
}

impl RoleManager {
    pub fn new(store: RoleStore, connections: Arc<dyn ConnectionProvider>) -> Self {
        Self::with_validator(store, connections, TemplateValidator::default())
    }

    pub fn with_validator(
        store: RoleStore,
        connections: Arc<dyn ConnectionProvider>,
        validator: TemplateValidator,
    ) -> Self {
        Self {
            store,
            connections,
            validator,
        }
    }

    /// Validate the template against its database, then store the role.
    ///
    /// Overwrites any existing role of the same name. Concurrent writes to
    /// one name are last-writer-wins.
    pub async fn create_or_replace(&self, request: WriteRoleRequest) -> Result<Role> {
        let role = request.validate()?;
        let db_name = role.db_name();

        let Some(conn) = self.connections.resolve(db_name).await else {
            debug!(db_name, "No connection registered for database");
            return Err(RolesError::database_unavailable(
                db_name,
                "no connection is configured",
            ));
        };

        let statements = self.validator.validate(conn.as_ref(), db_name, role.sql()).await?;

        self.store.put(&role).await?;
        info!(role = %role.name, db_name, statements, "Role saved");
        Ok(role)
    }

    pub async fn read(&self, name: &str) -> Result<Option<Role>> {
        let name = RoleName::parse(name)?;
        self.store.get(&name).await
    }

    pub async fn list(&self) -> Result<Vec<String>> {
        self.store.list().await
    }

    /// Remove a role. Deleting a role that does not exist succeeds.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let name = RoleName::parse(name)?;
        self.store.delete(&name).await?;
        info!(role = %name, "Role deleted");
        Ok(())
    }
}
