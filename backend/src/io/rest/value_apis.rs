//! # REST API for Raw Values
//!
//! Direct read and write access to single keys of the namespace. Writes go
//! through [`StorageManager::safe_write`](crate::storage::StorageManager::safe_write),
//! so a full namespace is cleaned up before the write is refused.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use shared::{ErrorResponse, KeyValue};
use tracing::{error, info};

use super::error_mapper::storage_error_response;
use crate::AppState;

/// Create a router for value related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(put_value))
        .route("/:key", get(get_value))
}

/// Axum handler function for GET /api/values/:key
pub async fn get_value(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    info!("GET /api/values/{}", key);

    match state.storage.get(&key).await {
        Ok(Some(value)) => (StatusCode::OK, Json(KeyValue { key, value })).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("not_found", format!("Key '{}' not found", key))),
        )
            .into_response(),
        Err(e) => {
            error!("Error retrieving value: {:?}", e);
            storage_error_response(&e)
        }
    }
}

/// Axum handler function for POST /api/values
pub async fn put_value(State(state): State<AppState>, Json(kv): Json<KeyValue>) -> Response {
    info!("POST /api/values - key: {}", kv.key);

    match state.storage.safe_write(&kv.key, &kv.value).await {
        Ok(()) => (StatusCode::CREATED, Json(kv)).into_response(),
        Err(e) => {
            error!("Error storing value: {:?}", e);
            storage_error_response(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::rest::test_utils::{body_json, setup_test_app};
    use crate::storage::MemoryStore;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn post_value(key: &str, value: &str) -> Request<Body> {
        let body = serde_json::to_string(&KeyValue {
            key: key.to_string(),
            value: value.to_string(),
        })
        .unwrap();
        Request::builder()
            .method("POST")
            .uri("/api/values")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get_value() {
        let store = MemoryStore::new();

        let response = setup_test_app(&store)
            .oneshot(post_value("app_theme", "dark"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = setup_test_app(&store)
            .oneshot(Request::builder().uri("/api/values/app_theme").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let kv: KeyValue = body_json(response).await;
        assert_eq!(kv.value, "dark");
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let response = setup_test_app(&MemoryStore::new())
            .oneshot(Request::builder().uri("/api/values/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: ErrorResponse = body_json(response).await;
        assert_eq!(body.error, "not_found");
    }

    #[tokio::test]
    async fn test_write_that_never_fits_is_storage_full() {
        let store = MemoryStore::with_capacity(16);

        let response = setup_test_app(&store)
            .oneshot(post_value("app_theme", "a-very-long-theme-name"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INSUFFICIENT_STORAGE);
        let body: ErrorResponse = body_json(response).await;
        assert_eq!(body.error, "storage_full");
    }

    #[tokio::test]
    async fn test_unavailable_storage_is_service_unavailable() {
        let store = MemoryStore::new();
        store.set_unavailable(true);

        let response = setup_test_app(&store)
            .oneshot(Request::builder().uri("/api/values/app_theme").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
