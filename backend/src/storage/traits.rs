//! # Storage Traits
//!
//! The persistent key-value namespace the storage manager guards. Backends
//! only need to store and enumerate text; quota policy, cleanup and retry live
//! in [`StorageManager`](super::StorageManager).

use async_trait::async_trait;

use super::error::StorageError;

/// A flat namespace of string keys holding string values.
///
/// Implementations report a full namespace with [`StorageError::QuotaExceeded`]
/// so the manager can clean up and retry.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read one value, `None` when the key is absent
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or overwrite a value
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a key. Returns true if it existed
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// Every key/value pair in the namespace, in no particular order
    async fn entries(&self) -> Result<Vec<(String, String)>, StorageError>;
}

/// Size of one entry the way the namespace accounts for it: characters of the
/// key plus characters of the value.
pub fn entry_size(key: &str, value: &str) -> usize {
    key.chars().count() + value.chars().count()
}
