//! Translation of domain and storage failures into HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use shared::ErrorResponse;

use crate::domain::ImportError;
use crate::storage::StorageError;

pub fn storage_error_status(error: &StorageError) -> StatusCode {
    match error {
        StorageError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        StorageError::QuotaExceeded { .. } | StorageError::StorageFull { .. } => {
            StatusCode::INSUFFICIENT_STORAGE
        }
        StorageError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn import_error_status(error: &ImportError) -> StatusCode {
    match error {
        ImportError::Oversize { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        ImportError::UnsupportedFileType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ImportError::Parse(_) => StatusCode::BAD_REQUEST,
        ImportError::ImportTooLarge { .. } => StatusCode::INSUFFICIENT_STORAGE,
        ImportError::ConfirmationRequired => StatusCode::PRECONDITION_REQUIRED,
        ImportError::Storage(e) => storage_error_status(e),
        ImportError::FieldWrite { .. } => StatusCode::INSUFFICIENT_STORAGE,
    }
}

pub fn storage_error_response(error: &StorageError) -> Response {
    (
        storage_error_status(error),
        Json(ErrorResponse::new(error.kind(), error.to_string())),
    )
        .into_response()
}

pub fn import_error_response(error: &ImportError) -> Response {
    (
        import_error_status(error),
        Json(ErrorResponse::new(error.kind(), error.to_string())),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CsvParseError;

    #[test]
    fn test_import_error_statuses() {
        let cases = [
            (ImportError::Oversize { size: 10, limit: 5 }, StatusCode::PAYLOAD_TOO_LARGE),
            (ImportError::UnsupportedFileType("a.txt".into()), StatusCode::UNSUPPORTED_MEDIA_TYPE),
            (ImportError::Parse(CsvParseError::NoDataRows), StatusCode::BAD_REQUEST),
            (
                ImportError::ImportTooLarge { estimated: 10, limit: 5 },
                StatusCode::INSUFFICIENT_STORAGE,
            ),
            (ImportError::ConfirmationRequired, StatusCode::PRECONDITION_REQUIRED),
            (
                ImportError::Storage(StorageError::Unavailable("off".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(import_error_status(&error), status, "{:?}", error);
        }
    }

    #[test]
    fn test_storage_error_statuses() {
        assert_eq!(
            storage_error_status(&StorageError::QuotaExceeded { key: "k".into() }),
            StatusCode::INSUFFICIENT_STORAGE
        );
        assert_eq!(
            storage_error_status(&StorageError::Backend("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
