use serde::{Deserialize, Serialize};

/// A single raw entry of the persisted key-value namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

/// Result of exporting the full snapshot as CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDataResponse {
    /// The complete CSV document, header row included
    pub csv_content: String,
    /// Suggested download name (`health-tracker-export-YYYY-MM-DD.csv`)
    pub filename: String,
    /// MIME type of the artifact
    pub mime_type: String,
    /// Number of data rows (header excluded)
    pub row_count: usize,
}

/// Query parameters accepted by the import endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDataRequest {
    /// Original file name, used to infer the file type when no content type is declared
    pub filename: Option<String>,
    /// The user must confirm before any destructive write happens
    #[serde(default)]
    pub confirm: bool,
}

/// Outcome of a completed import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDataResponse {
    pub success: bool,
    pub message: String,
    /// Storage keys that were rewritten, in write order
    pub keys_written: Vec<String>,
    /// Number of data rows read from the file
    pub row_count: usize,
}

/// Snapshot of storage usage against the active quota tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageStatusResponse {
    pub available: bool,
    pub tier: String,
    pub usage_bytes: usize,
    pub remaining_bytes: usize,
    pub quota_bytes: usize,
    pub near_quota: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupResponse {
    /// True when at least one history key was trimmed and rewritten
    pub freed: bool,
    pub usage_bytes: usize,
}

/// Human-readable error body returned by every failing endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable error kind (e.g. `storage_full`)
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_request_confirm_defaults_to_false() {
        let request: ImportDataRequest = serde_json::from_str(r#"{"filename":"backup.csv"}"#).unwrap();
        assert_eq!(request.filename.as_deref(), Some("backup.csv"));
        assert!(!request.confirm);
    }

    #[test]
    fn test_error_response_serializes_kind_and_message() {
        let body = ErrorResponse::new("storage_full", "Storage is full");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "storage_full");
        assert_eq!(json["message"], "Storage is full");
    }
}
