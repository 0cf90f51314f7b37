//! Roles API Integration Tests
//!
//! Drives the router in-process with `oneshot`.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use dbr_config::DatabaseConfig;
use dbr_roles::api::{HelpResponse, ListResponse, HELP_SYNOPSIS};
use dbr_roles::{
    roles_router, ConnectionRegistry, MemoryStorage, RoleManager, RoleStore, RolesState, SqlxConnection,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn create_test_app() -> Router {
    let registry = ConnectionRegistry::new();
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        acquire_timeout_secs: 5,
    };
    registry.register("app", Arc::new(SqlxConnection::connect_lazy(&config).unwrap()));

    let manager = RoleManager::new(
        RoleStore::new(Arc::new(MemoryStorage::new())),
        Arc::new(registry),
    );
    let (router, _) = roles_router(RolesState {
        manager: Arc::new(manager),
    })
    .split_for_parts();
    router
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_raw(app: &Router, uri: &str, content_type: Option<&str>, body: &'static str) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(Method::POST).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header("Content-Type", content_type);
    }

    let response = app.clone().oneshot(builder.body(Body::from(body)).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_write_read_list_delete() {
    let app = create_test_app();

    let (status, _) = send(
        &app,
        Method::POST,
        "/roles/reader",
        Some(json!({ "sql": "SELECT 1;", "db_name": "app" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, "/roles/reader", None).await;
    assert_eq!(status, StatusCode::OK);
    let entry: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(entry, json!({ "sql": "SELECT 1;", "db_name": "app" }));

    let (status, body) = send(&app, Method::GET, "/roles", None).await;
    assert_eq!(status, StatusCode::OK);
    let list: ListResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(list.keys, vec!["reader"]);

    let (status, _) = send(&app, Method::DELETE, "/roles/reader", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, "/roles/reader", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_put_replaces() {
    let app = create_test_app();

    for sql in ["SELECT 1", "SELECT 2"] {
        let (status, _) = send(
            &app,
            Method::PUT,
            "/roles/reader",
            Some(json!({ "sql": sql, "db_name": "app" })),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    let (_, body) = send(&app, Method::GET, "/roles/reader", None).await;
    let entry: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(entry["sql"], "SELECT 2");
}

#[tokio::test]
async fn test_template_failure_is_bad_request() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/roles/broken",
        Some(json!({ "sql": "SELEKT 1;", "db_name": "app" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"], "TEMPLATE_VALIDATION_FAILED");
    assert!(error["message"].as_str().unwrap().contains("SELEKT 1"));

    let (status, _) = send(&app, Method::GET, "/roles/broken", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_database_is_bad_request() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/roles/orphan",
        Some(json!({ "sql": "SELECT 1", "db_name": "nope" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"], "DATABASE_UNAVAILABLE");
}

#[tokio::test]
async fn test_missing_fields_are_bad_request() {
    let app = create_test_app();

    let (status, body) = send(&app, Method::POST, "/roles/reader", Some(json!({ "sql": "SELECT 1" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = create_test_app();

    let (status, error) = send_raw(&app, "/roles/reader", Some("application/json"), r#"{"sql": "SELECT 1","#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "INVALID_REQUEST");
    assert!(error["message"].as_str().unwrap().starts_with("Invalid request:"));

    let (status, _) = send(&app, Method::GET, "/roles/reader", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_content_type_is_bad_request() {
    let app = create_test_app();

    let (status, error) = send_raw(&app, "/roles/reader", None, r#"{"sql": "SELECT 1", "db_name": "app"}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "INVALID_REQUEST");
    assert!(error["message"].as_str().unwrap().contains("Content-Type"));
}

#[tokio::test]
async fn test_help() {
    let app = create_test_app();

    let (status, body) = send(&app, Method::GET, "/roles?help=true", None).await;
    assert_eq!(status, StatusCode::OK);

    let help: HelpResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(help.synopsis, HELP_SYNOPSIS);
    assert!(help.description.contains("{{password}}"));
}
