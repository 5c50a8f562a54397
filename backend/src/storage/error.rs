use thiserror::Error;

/// Failures surfaced by the persistent key-value namespace and the storage manager.
///
/// Nothing in the storage layer panics or propagates a raw backend fault; every
/// failure ends up as one of these variants.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The namespace cannot be written at all (probe failed, private mode, closed pool)
    #[error("Storage is unavailable: {0}")]
    Unavailable(String),

    /// A single write would push the namespace over its capacity
    #[error("Storage quota exceeded while writing '{key}'")]
    QuotaExceeded { key: String },

    /// A write still failed after cleaning up old history
    #[error("Storage is full: could not save '{key}' ({bytes} characters) even after cleanup")]
    StorageFull { key: String, bytes: usize },

    /// Any other backend failure
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded { .. })
    }

    /// Stable kind tag used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            StorageError::Unavailable(_) => "storage_unavailable",
            StorageError::QuotaExceeded { .. } => "quota_exceeded",
            StorageError::StorageFull { .. } => "storage_full",
            StorageError::Backend(_) => "storage_backend",
        }
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
                StorageError::Unavailable(err.to_string())
            }
            other => StorageError::Backend(other.to_string()),
        }
    }
}
