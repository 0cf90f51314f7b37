//! Role Entity
//!
//! A role binds a SQL template to a named database. The name is the storage
//! key suffix and is not part of the persisted payload.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::error::{Result, RolesError};

/// Letters, digits, dashes and underscores; no leading or trailing dash.
fn name_pattern() -> &'static Regex {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\w(?:[\w-]*\w)?$").unwrap())
}

/// A validated role name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleName(String);

impl RoleName {
    pub fn parse(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(RolesError::invalid_request("role name is required"));
        }
        if !name.is_ascii() || !name_pattern().is_match(&name) {
            return Err(RolesError::invalid_request(format!(
                "invalid role name '{}': use letters, digits, '-' and '_'",
                name
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RoleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Persisted role record: `{ "sql": ..., "db_name": ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoleEntry {
    /// SQL template, one or more `;`-separated statements
    pub sql: String,

    /// Name of the database the template was validated against
    pub db_name: String,
}

/// A role together with its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: RoleName,
    pub entry: RoleEntry,
}

impl Role {
    pub fn new(name: RoleName, sql: impl Into<String>, db_name: impl Into<String>) -> Self {
        Self {
            name,
            entry: RoleEntry {
                sql: sql.into(),
                db_name: db_name.into(),
            },
        }
    }

    pub fn sql(&self) -> &str {
        &self.entry.sql
    }

    pub fn db_name(&self) -> &str {
        &self.entry.db_name
    }
}

/// Inbound create/replace request, validated once at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteRoleRequest {
    pub name: String,
    pub sql: String,
    pub db_name: String,
}

impl WriteRoleRequest {
    pub fn new(name: impl Into<String>, sql: impl Into<String>, db_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            db_name: db_name.into(),
        }
    }

    /// Check name format and required fields, producing the role to persist.
    ///
    /// A template made only of delimiters (`";;"`) is accepted here; it
    /// validates as zero statements.
    pub fn validate(self) -> Result<Role> {
        let name = RoleName::parse(self.name)?;

        if self.sql.trim().is_empty() {
            return Err(RolesError::invalid_request("sql is required"));
        }

        let db_name = self.db_name.trim();
        if db_name.is_empty() {
            return Err(RolesError::invalid_request("db_name is required"));
        }

        Ok(Role::new(name, self.sql, db_name))
    }
}
