//! DbRoles Server
//!
//! Serves the roles API over HTTP:
//! - `/roles` and `/roles/{name}` role management
//! - `/openapi.json` generated API description
//! - `/health` liveness
//!
//! ## Configuration
//!
//! Read from `dbroles.toml` (or `DBROLES_CONFIG`), then overridden by:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DBROLES_HTTP_HOST` | `0.0.0.0` | Bind address |
//! | `DBROLES_HTTP_PORT` | `8200` | HTTP port |
//! | `DBROLES_STORAGE_BACKEND` | `sqlite` | `memory` or `sqlite` |
//! | `DBROLES_STORAGE_URL` | `sqlite://./data/roles.db?mode=rwc` | SQLite URL for role storage |
//! | `LOG_FORMAT` | text | `json` for JSON logs |
//! | `RUST_LOG` | `info` | Log level |

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use utoipa::openapi::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use dbr_config::{AppConfig, ConfigLoader};
use dbr_roles::{
    roles_router, ConnectionRegistry, MemoryStorage, RoleManager, RoleStore, RolesState,
    SqliteStorage, Storage,
};

#[tokio::main]
async fn main() -> Result<()> {
    dbr_common::logging::init_logging("dbr-server");

    info!("Starting DbRoles Server");

    let config = ConfigLoader::new().load()?;

    let storage = open_storage(&config).await?;
    info!(backend = storage.name(), "Role storage ready");

    let registry = Arc::new(ConnectionRegistry::from_config(&config.databases)?);
    if registry.is_empty() {
        warn!("No databases configured; every role write will be rejected");
    } else {
        info!(databases = ?registry.names(), "Database connections configured");
    }

    let manager = RoleManager::new(RoleStore::new(storage), registry.clone());
    let roles_state = RolesState {
        manager: Arc::new(manager),
    };

    let (router, mut openapi) = OpenApiRouter::new()
        .merge(roles_router(roles_state))
        .split_for_parts();

    openapi.info.title = "DbRoles API".to_string();
    openapi.info.version = env!("CARGO_PKG_VERSION").to_string();
    openapi.info.description = Some("Validated SQL templates for database credential provisioning".to_string());

    let app = Router::new()
        .merge(router)
        .route("/health", get(health_handler))
        .route("/openapi.json", get(move || openapi_handler(openapi)))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.http.host, config.http.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("API server listening on http://{}", addr);
    info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown signal received, closing database pools...");
    registry.close_all().await;

    info!("DbRoles Server shutdown complete");
    Ok(())
}

async fn open_storage(config: &AppConfig) -> Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.storage.backend.as_str() {
        "memory" => {
            warn!("Using in-memory role storage; roles are lost on restart");
            Arc::new(MemoryStorage::new())
        }
        _ => {
            ensure_sqlite_parent(&config.storage.url)?;
            Arc::new(SqliteStorage::connect(&config.storage.url).await?)
        }
    };
    Ok(storage)
}

/// Create the directory holding a file-backed SQLite database
fn ensure_sqlite_parent(url: &str) -> Result<()> {
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or_default();

    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

async fn openapi_handler(openapi: OpenApi) -> Json<OpenApi> {
    Json(openapi)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
