//! Template Validator
//!
//! Proves a template is usable before it is stored: every statement is
//! rendered with probe values and prepared, never executed, on the target
//! database.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::connection::{ConnectionError, DatabaseConnection};
use crate::error::{Result, RolesError};
use crate::template::{parse_statements, BraceRenderer, Renderer};

/// Identifier substituted for `{{name}}` while probing
pub const PROBE_NAME: &str = "foo";
/// Secret substituted for `{{password}}` while probing
pub const PROBE_PASSWORD: &str = "bar";
/// `{{expiration}}` is probed empty
pub const PROBE_EXPIRATION: &str = "";

/// The only keys ever handed to the renderer during validation
pub fn probe_values() -> BTreeMap<&'static str, &'static str> {
    BTreeMap::from([
        ("name", PROBE_NAME),
        ("password", PROBE_PASSWORD),
        ("expiration", PROBE_EXPIRATION),
    ])
}

#[derive(Clone)]
pub struct TemplateValidator {
    renderer: Arc<dyn Renderer>,
}

impl Default for TemplateValidator {
    fn default() -> Self {
        Self::new(Arc::new(BraceRenderer))
    }
}

impl TemplateValidator {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self { renderer }
    }

    /// Prepare each statement of `template` on `conn` in order.
    ///
    /// Returns the number of statements checked. Stops at the first
    /// statement the database rejects; later statements are not attempted.
    pub async fn validate(
        &self,
        conn: &dyn DatabaseConnection,
        db_name: &str,
        template: &str,
    ) -> Result<usize> {
        let statements = parse_statements(template);
        let values = probe_values();

        for (index, statement) in statements.iter().enumerate() {
            let rendered = self.renderer.render(statement, &values);
            debug!(db_name, index, len = statement.len(), "Probing statement");

            match conn.prepare(&rendered).await {
                Ok(prepared) => prepared.close(),
                Err(ConnectionError::Unavailable(reason)) => {
                    warn!(db_name, reason = %reason, "Database unavailable during validation");
                    return Err(RolesError::database_unavailable(db_name, reason));
                }
                Err(ConnectionError::Prepare(message)) => {
                    warn!(db_name, index, error = %message, "Template statement failed to prepare");
                    return Err(RolesError::TemplateValidation {
                        index,
                        statement: statement.clone(),
                        message,
                    });
                }
            }
        }

        Ok(statements.len())
    }
}
