//! Shared helpers for the REST handler tests

use axum::{body::Body, http::HeaderValue, response::Response, Router};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::config::DeviceTier;
use crate::storage::{MemoryStore, StorageManager};
use crate::{create_router, AppState};

pub(crate) const TEST_ORIGIN: &str = "http://localhost:8080";

/// Application state over `store` with the standard tier
pub(crate) fn setup_test_state(store: &MemoryStore) -> AppState {
    let tier = DeviceTier::Standard;
    let storage = StorageManager::new(Arc::new(store.clone()), tier.quota_config());
    AppState::new(storage, tier)
}

pub(crate) fn setup_test_app(store: &MemoryStore) -> Router {
    create_router(setup_test_state(store), HeaderValue::from_static(TEST_ORIGIN))
}

pub(crate) async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body")
        .to_vec()
}

pub(crate) async fn body_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("Response body is not the expected JSON")
}
