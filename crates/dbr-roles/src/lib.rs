//! DbRoles
//!
//! Named, validated SQL templates for provisioning database credentials:
//! - Role entity persisted as `{ sql, db_name }` under `role/<name>`
//! - Pluggable key/value storage (in-memory, SQLite)
//! - Template validation by preparing every statement on the target database
//! - Role manager tying validation to persistence
//! - REST endpoints with OpenAPI descriptions
//!
//! ## Module Organization
//!
//! - `entity` / `store` - the role record and its storage mapping
//! - `storage` - key/value backends
//! - `connection` - named database connections used for validation
//! - `template` / `validator` - statement parsing, rendering and probing
//! - `manager` - role operations
//! - `api` - HTTP handlers

pub mod api;
pub mod connection;
pub mod entity;
pub mod error;
pub mod manager;
pub mod storage;
pub mod store;
pub mod template;
pub mod validator;

pub use api::{roles_router, RolesState};
pub use connection::{
    ConnectionError, ConnectionProvider, ConnectionRegistry, DatabaseConnection, PreparedStatement,
    SqlxConnection,
};
pub use entity::{Role, RoleEntry, RoleName, WriteRoleRequest};
pub use error::{Result, RolesError};
pub use manager::RoleManager;
pub use storage::{MemoryStorage, SqliteStorage, Storage, StorageEntry};
pub use store::RoleStore;
pub use template::{BraceRenderer, Renderer};
pub use validator::TemplateValidator;
