//! Roles API
//!
//! REST endpoints for role management.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::entity::{RoleEntry, WriteRoleRequest};
use crate::error::{ErrorResponse, RolesError};
use crate::manager::RoleManager;

pub const HELP_SYNOPSIS: &str = "Manage the roles that database credentials are created from.";

pub const HELP_DESCRIPTION: &str = r#"Each role names a database and holds the SQL used to create a user in it.

The "sql" parameter may hold several statements separated by ";". It may also
be given as a JSON array of statements, or base64 encoded. Placeholders
surrounded by "{{" and "}}" are filled in when credentials are issued:

  * "name" - the generated username

  * "password" - the generated password

  * "expiration" - the time the user expires

Every statement is prepared against "db_name" before the role is saved, so a
role that cannot be prepared is never stored. A ";" inside a quoted string
still ends the statement.

Any "sql" value that is valid base64 and decodes to text is treated as
encoded. A bare single word made only of base64 characters can therefore be
decoded by mistake; give such a statement as a JSON array instead.

Example for PostgreSQL:

    CREATE ROLE "{{name}}" WITH
      LOGIN
      PASSWORD '{{password}}'
      VALID UNTIL '{{expiration}}';
    GRANT SELECT ON ALL TABLES IN SCHEMA public TO "{{name}}";
"#;

/// Roles service state
#[derive(Clone)]
pub struct RolesState {
    pub manager: Arc<RoleManager>,
}

/// Create or replace role request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct WriteRoleBody {
    /// SQL template
    #[serde(default)]
    pub sql: String,

    /// Database the template is validated against
    #[serde(default)]
    pub db_name: String,
}

/// Role name listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListResponse {
    pub keys: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HelpResponse {
    pub synopsis: String,
    pub description: String,
}

impl HelpResponse {
    pub fn new() -> Self {
        Self {
            synopsis: HELP_SYNOPSIS.to_string(),
            description: HELP_DESCRIPTION.to_string(),
        }
    }
}

impl Default for HelpResponse {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListRolesQuery {
    /// Return help text instead of the listing
    #[serde(default)]
    pub help: bool,
}

/// List roles
#[utoipa::path(
    get,
    path = "/roles",
    tag = "roles",
    operation_id = "listRoles",
    params(ListRolesQuery),
    responses(
        (status = 200, description = "Role names, or help text when help=true", body = ListResponse),
        (status = 500, description = "Storage fault", body = ErrorResponse)
    )
)]
pub async fn list_roles(
    State(state): State<RolesState>,
    Query(query): Query<ListRolesQuery>,
) -> Result<Response, RolesError> {
    if query.help {
        return Ok(Json(HelpResponse::new()).into_response());
    }

    let keys = state.manager.list().await?;
    Ok(Json(ListResponse { keys }).into_response())
}

/// Read role
#[utoipa::path(
    get,
    path = "/roles/{name}",
    tag = "roles",
    operation_id = "readRole",
    params(
        ("name" = String, Path, description = "Role name")
    ),
    responses(
        (status = 200, description = "Role found", body = RoleEntry),
        (status = 404, description = "Role not found")
    )
)]
pub async fn read_role(
    State(state): State<RolesState>,
    Path(name): Path<String>,
) -> Result<Response, RolesError> {
    match state.manager.read(&name).await? {
        Some(role) => Ok(Json(role.entry).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

/// Create role
#[utoipa::path(
    post,
    path = "/roles/{name}",
    tag = "roles",
    operation_id = "createRole",
    params(
        ("name" = String, Path, description = "Role name")
    ),
    request_body = WriteRoleBody,
    responses(
        (status = 204, description = "Role validated and saved"),
        (status = 400, description = "Invalid request, unknown database or template failed to prepare", body = ErrorResponse)
    )
)]
pub async fn create_role(
    State(state): State<RolesState>,
    Path(name): Path<String>,
    payload: Result<Json<WriteRoleBody>, JsonRejection>,
) -> Result<StatusCode, RolesError> {
    let Json(body) = payload?;
    write_role(&state, name, body).await
}

/// Replace role
#[utoipa::path(
    put,
    path = "/roles/{name}",
    tag = "roles",
    operation_id = "replaceRole",
    params(
        ("name" = String, Path, description = "Role name")
    ),
    request_body = WriteRoleBody,
    responses(
        (status = 204, description = "Role validated and saved"),
        (status = 400, description = "Invalid request, unknown database or template failed to prepare", body = ErrorResponse)
    )
)]
pub async fn replace_role(
    State(state): State<RolesState>,
    Path(name): Path<String>,
    payload: Result<Json<WriteRoleBody>, JsonRejection>,
) -> Result<StatusCode, RolesError> {
    let Json(body) = payload?;
    write_role(&state, name, body).await
}

async fn write_role(state: &RolesState, name: String, body: WriteRoleBody) -> Result<StatusCode, RolesError> {
    state
        .manager
        .create_or_replace(WriteRoleRequest::new(name, body.sql, body.db_name))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete role
#[utoipa::path(
    delete,
    path = "/roles/{name}",
    tag = "roles",
    operation_id = "deleteRole",
    params(
        ("name" = String, Path, description = "Role name")
    ),
    responses(
        (status = 204, description = "Role deleted, or did not exist")
    )
)]
pub async fn delete_role(
    State(state): State<RolesState>,
    Path(name): Path<String>,
) -> Result<StatusCode, RolesError> {
    state.manager.delete(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create roles router
pub fn roles_router(state: RolesState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_roles))
        .routes(routes!(read_role, create_role, replace_role, delete_role))
        .with_state(state)
}
