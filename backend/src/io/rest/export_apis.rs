//! # REST API for Data Export
//!
//! Endpoints for downloading the full tracker snapshot as a CSV backup.

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use tracing::{info, warn};

use crate::AppState;

/// Create a router for export related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(download_export))
        .route("/json", get(export_json))
}

/// Download the snapshot as a CSV attachment
pub async fn download_export(State(state): State<AppState>) -> Response {
    info!("GET /api/export");

    let export = state.export_service.export_csv(&state.storage).await;
    let disposition = format!("attachment; filename=\"{}\"", export.filename);
    let disposition = match HeaderValue::from_str(&disposition) {
        Ok(value) => value,
        Err(e) => {
            warn!("⚠️ Could not build Content-Disposition for {}: {}", export.filename, e);
            HeaderValue::from_static("attachment")
        }
    };

    info!("✅ Export download ready: {} ({} rows)", export.filename, export.row_count);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.csv_content,
    )
        .into_response()
}

/// The export artifact wrapped in JSON, for clients that save the file themselves
pub async fn export_json(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/export/json");

    let export = state.export_service.export_csv(&state.storage).await;
    info!("✅ Export CSV operation completed successfully");
    (StatusCode::OK, Json(export))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::rest::test_utils::{body_bytes, body_json, setup_test_app};
    use crate::storage::{keys, KeyValueStore, MemoryStore};
    use axum::body::Body;
    use axum::http::Request;
    use shared::ExportDataResponse;
    use tower::ServiceExt;

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.set(keys::GOAL_WATER, "2000").await.unwrap();
        store.set(keys::APP_THEME, "dark").await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_download_export_is_a_csv_attachment() {
        let app = setup_test_app(&seeded_store().await);

        let response = app
            .oneshot(Request::builder().uri("/api/export").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"health-tracker-export-"));
        assert!(disposition.ends_with(".csv\""));

        let csv = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(csv.starts_with(
            "data_type,key,value,date,amount,timestamp,type,count,name,color,completed,order\n"
        ));
        assert!(csv.contains("\nwater,goal,2000,"));
        assert!(csv.contains("\nsettings,theme,dark,"));
    }

    #[tokio::test]
    async fn test_export_json() {
        let app = setup_test_app(&seeded_store().await);

        let response = app
            .oneshot(Request::builder().uri("/api/export/json").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let export: ExportDataResponse = body_json(response).await;
        assert_eq!(export.mime_type, "text/csv");
        // version, export_date, water goal, theme
        assert_eq!(export.row_count, 4);
    }
}
