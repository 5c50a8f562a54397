//! # REST API for Data Import
//!
//! `POST /api/import?filename=<name>&confirm=true` with the raw file as the
//! request body. The declared `Content-Type` and the file name decide whether
//! the upload counts as CSV.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use shared::{ImportDataRequest, ImportDataResponse};
use tracing::{error, info, warn};

use super::error_mapper::import_error_response;
use crate::domain::{ImportError, ImportFile};
use crate::AppState;

/// Create a router for import related APIs
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(import_csv))
}

pub async fn import_csv(
    State(state): State<AppState>,
    Query(request): Query<ImportDataRequest>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    info!(
        "POST /api/import - filename: {:?}, confirm: {}, {} bytes",
        request.filename,
        request.confirm,
        body.len()
    );

    let file = ImportFile {
        filename: request.filename,
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        bytes: body.to_vec(),
    };

    match state.import_service.import(&state.storage, file, request.confirm).await {
        Ok(report) => {
            info!("✅ Import completed: {} keys written", report.keys_written.len());
            let response = ImportDataResponse {
                success: true,
                message: format!(
                    "Imported {} rows into {} storage keys",
                    report.rows_read,
                    report.keys_written.len()
                ),
                keys_written: report.keys_written,
                row_count: report.rows_read,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            match &e {
                ImportError::FieldWrite { field, backup, .. } => error!(
                    "❌ Import stopped at {}; earlier fields remain written, backup of {} keys was not applied",
                    field,
                    backup.len()
                ),
                ImportError::ConfirmationRequired => info!("Import awaiting confirmation"),
                other => warn!("⚠️ Import rejected: {}", other),
            }
            import_error_response(&e)
        }
    }
}
