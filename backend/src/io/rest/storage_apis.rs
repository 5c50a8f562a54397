//! # REST API for Storage Status
//!
//! Usage reporting against the active quota tier and on-demand cleanup of
//! old history.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use shared::{CleanupResponse, StorageStatusResponse};
use tracing::info;

use crate::AppState;

/// Create a router for storage related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(storage_status))
        .route("/cleanup", post(cleanup))
}

pub async fn storage_status(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/storage/status");

    let storage = &state.storage;
    let usage_bytes = storage.usage().await;
    let quota_bytes = storage.quota().quota_bytes;
    let response = StorageStatusResponse {
        available: storage.is_available().await,
        tier: state.tier.to_string(),
        usage_bytes,
        remaining_bytes: quota_bytes.saturating_sub(usage_bytes),
        quota_bytes,
        near_quota: usage_bytes as f64 >= storage.near_quota_limit(),
    };

    (StatusCode::OK, Json(response))
}

pub async fn cleanup(State(state): State<AppState>) -> impl IntoResponse {
    info!("POST /api/storage/cleanup");

    let freed = state.storage.cleanup_old_data().await;
    let usage_bytes = state.storage.usage().await;
    info!("🧹 Manual cleanup finished (freed: {}, usage now {})", freed, usage_bytes);

    (StatusCode::OK, Json(CleanupResponse { freed, usage_bytes }))
}
