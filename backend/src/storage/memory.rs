use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::error::StorageError;
use super::traits::{entry_size, KeyValueStore};

/// In-process key-value namespace.
///
/// Shares the capacity rule of [`SqliteStore`](super::SqliteStore) and can be
/// switched into an "unavailable" mode where every call fails, which is what a
/// browser in private mode looks like to the storage manager.
#[derive(Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
    capacity_bytes: Option<usize>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity_bytes: usize) -> Self {
        Self {
            capacity_bytes: Some(capacity_bytes),
            ..Self::default()
        }
    }

    /// Make every subsequent call fail (or succeed again)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "storage access is disabled".to_string(),
            ));
        }
        self.values
            .lock()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.lock()?;

        if let Some(capacity) = self.capacity_bytes {
            let current: usize = values.iter().map(|(k, v)| entry_size(k, v)).sum();
            let replaced = values.get(key).map(|old| entry_size(key, old)).unwrap_or(0);
            if current - replaced + entry_size(key, value) > capacity {
                return Err(StorageError::QuotaExceeded { key: key.to_string() });
            }
        }

        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.lock()?.remove(key).is_some())
    }

    async fn entries(&self) -> Result<Vec<(String, String)>, StorageError> {
        Ok(self
            .lock()?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set("goal_water", "2000").await.unwrap();

        store.set_unavailable(true);
        assert!(matches!(store.get("goal_water").await, Err(StorageError::Unavailable(_))));
        assert!(matches!(store.set("x", "y").await, Err(StorageError::Unavailable(_))));

        store.set_unavailable(false);
        assert_eq!(store.get("goal_water").await.unwrap().as_deref(), Some("2000"));
    }

    #[tokio::test]
    async fn test_capacity_is_enforced() {
        let store = MemoryStore::with_capacity(10);

        store.set("ab", "cdefgh").await.unwrap(); // 8
        assert!(store.set("x", "yz").await.unwrap_err().is_quota_exceeded()); // 11
        store.set("ab", "cdefghij").await.unwrap(); // replaced: 10
    }
}
