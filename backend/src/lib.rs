//! # Health Tracker Backend
//!
//! Durable state of the health tracker and its CSV backup and restore.
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (REST API, handlers)
//!     ↓
//! Domain Layer (CSV codec, export and import services)
//!     ↓
//! Storage Layer (storage manager over a key-value namespace)
//! ```
//!
//! The storage layer is initialized once at startup with the quota policy of
//! the configured device tier. Startup fails if the namespace cannot be
//! written at all.

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::{bail, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::{AppConfig, DeviceTier, StoreConfig};
use crate::domain::{ExportService, ImportService};
use crate::io::rest::{export_apis, import_apis, storage_apis, value_apis};
use crate::storage::{KeyValueStore, MemoryStore, SqliteStore, StorageManager};

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub storage: StorageManager,
    pub export_service: ExportService,
    pub import_service: ImportService,
    pub tier: DeviceTier,
}

impl AppState {
    pub fn new(storage: StorageManager, tier: DeviceTier) -> Self {
        Self {
            storage,
            export_service: ExportService::new(),
            import_service: ImportService::new(),
            tier,
        }
    }
}

async fn open_store(config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config {
        StoreConfig::Sqlite {
            database_url,
            capacity_bytes,
        } => {
            info!("Setting up database at {}", database_url);
            Arc::new(SqliteStore::connect(database_url, *capacity_bytes).await?)
        }
        StoreConfig::Memory { capacity_bytes } => {
            info!("Setting up in-memory storage");
            Arc::new(match capacity_bytes {
                Some(capacity) => MemoryStore::with_capacity(*capacity),
                None => MemoryStore::new(),
            })
        }
    };
    Ok(store)
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    let store = open_store(&config.store).await?;

    let tier = config.device_tier;
    let quota = tier.quota_config();
    info!(
        "Setting up storage manager for {} tier (quota {} characters, {} days of history)",
        tier, quota.quota_bytes, quota.max_history_days
    );
    let storage = StorageManager::new(store, quota);

    if !storage.is_available().await {
        bail!("Storage is unavailable: the namespace could not be written");
    }

    info!("Setting up application state");
    Ok(AppState::new(storage, tier))
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, allowed_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    // Leave headroom above the import ceiling so oversize files reach the
    // handler and get a JSON error instead of a bare 413
    let body_limit = app_state.storage.quota().max_import_bytes * 2;

    Router::new()
        .nest("/api/export", export_apis::router())
        .nest("/api/import", import_apis::router())
        .nest("/api/storage", storage_apis::router())
        .nest("/api/values", value_apis::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_with_memory_store() {
        let config = AppConfig {
            device_tier: DeviceTier::Constrained,
            store: StoreConfig::Memory { capacity_bytes: None },
            ..AppConfig::default()
        };

        let state = initialize_backend(&config).await.unwrap();

        assert_eq!(state.tier, DeviceTier::Constrained);
        assert_eq!(state.storage.quota().quota_bytes, 2 * 1024 * 1024);
        assert_eq!(state.storage.usage().await, 0);
    }

    #[tokio::test]
    async fn test_initialize_with_sqlite_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("tracker.db");
        let config = AppConfig {
            store: StoreConfig::Sqlite {
                database_url: format!("sqlite:{}", path.display()),
                capacity_bytes: None,
            },
            ..AppConfig::default()
        };

        let state = initialize_backend(&config).await.unwrap();

        assert!(state.storage.is_available().await);
        assert_eq!(state.tier, DeviceTier::Standard);
    }

    #[tokio::test]
    async fn test_unwritable_namespace_fails_startup() {
        let config = AppConfig {
            store: StoreConfig::Memory { capacity_bytes: Some(4) },
            ..AppConfig::default()
        };

        let result = initialize_backend(&config).await;

        assert!(result.is_err());
    }
}
