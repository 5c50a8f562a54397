//! # Storage Manager
//!
//! Sole gateway to the persistent key-value namespace. It accounts usage
//! against the tier's fixed quota, trims old history when space runs out and
//! retries a failed write once after doing so.
//!
//! No method panics or leaks a raw backend fault: availability and quota
//! questions answer with plain values (logging what went wrong), reads and
//! writes answer with [`StorageError`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::error::StorageError;
use super::keys::{HistoryLayout, HISTORY_KEYS, PROBE_KEY};
use super::traits::{entry_size, KeyValueStore};
use crate::config::QuotaConfig;
use crate::domain::models::OrderedMap;

/// Copy of every key/value pair in the namespace, taken before an import
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceBackup {
    pub entries: BTreeMap<String, String>,
    pub taken_at: DateTime<Utc>,
}

impl NamespaceBackup {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone)]
pub struct StorageManager {
    store: Arc<dyn KeyValueStore>,
    quota: QuotaConfig,
}

impl StorageManager {
    pub fn new(store: Arc<dyn KeyValueStore>, quota: QuotaConfig) -> Self {
        Self { store, quota }
    }

    pub fn quota(&self) -> &QuotaConfig {
        &self.quota
    }

    /// Probe writability with a throwaway write and delete
    pub async fn is_available(&self) -> bool {
        let probe = async {
            self.store.set(PROBE_KEY, PROBE_KEY).await?;
            self.store.remove(PROBE_KEY).await?;
            Ok::<(), StorageError>(())
        };

        match probe.await {
            Ok(()) => true,
            Err(e) => {
                warn!("🚫 Storage availability probe failed: {}", e);
                false
            }
        }
    }

    /// Characters of every key plus its value across the namespace.
    /// An unreadable namespace reports zero.
    pub async fn usage(&self) -> usize {
        match self.store.entries().await {
            Ok(entries) => entries.iter().map(|(k, v)| entry_size(k, v)).sum(),
            Err(e) => {
                error!("❌ Failed to measure storage usage: {}", e);
                0
            }
        }
    }

    pub async fn remaining_space(&self) -> usize {
        self.quota.quota_bytes.saturating_sub(self.usage().await)
    }

    /// Usage at which the namespace counts as nearly full
    pub fn near_quota_limit(&self) -> f64 {
        self.quota.quota_bytes as f64 * self.quota.near_quota_threshold
    }

    pub async fn is_near_quota(&self) -> bool {
        let usage = self.usage().await;
        let near = usage as f64 >= self.near_quota_limit();
        if near {
            warn!(
                "⚠️ Storage near quota: {} of {} characters used",
                usage, self.quota.quota_bytes
            );
        }
        near
    }

    /// Trim every history key to the most recent `max_history_days` dates.
    ///
    /// Keys that are missing, unreadable or unparseable are skipped. Only
    /// trimmed keys are rewritten. Returns true if anything was freed.
    pub async fn cleanup_old_data(&self) -> bool {
        let keep = self.quota.max_history_days;
        let mut freed = false;

        for (key, layout) in HISTORY_KEYS {
            let raw = match self.store.get(key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!("🧹 Cleanup skipped '{}': {}", key, e);
                    continue;
                }
            };

            let trimmed = match layout {
                HistoryLayout::DateBuckets => trim_date_buckets(&raw, keep),
                HistoryLayout::HabitList => trim_habit_histories(&raw, keep),
            };

            match trimmed {
                Ok(Some(value)) => match self.store.set(key, &value).await {
                    Ok(()) => {
                        info!(
                            "🧹 Trimmed '{}' to {} days ({} -> {} characters)",
                            key,
                            keep,
                            raw.chars().count(),
                            value.chars().count()
                        );
                        freed = true;
                    }
                    Err(e) => warn!("🧹 Failed to rewrite trimmed '{}': {}", key, e),
                },
                Ok(None) => debug!("🧹 '{}' already within {} days", key, keep),
                Err(e) => warn!("🧹 Cleanup skipped unparseable '{}': {}", key, e),
            }
        }

        freed
    }

    /// Write a value, cleaning up old history and retrying once if the
    /// namespace is full. A second failure is reported as
    /// [`StorageError::StorageFull`]; the value is never silently dropped.
    pub async fn safe_write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match self.store.set(key, value).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_quota_exceeded() => {
                warn!("⚠️ Quota exceeded writing '{}', cleaning up old history", key);
                let freed = self.cleanup_old_data().await;

                match self.store.set(key, value).await {
                    Ok(()) => {
                        info!("✅ Saved '{}' after cleanup", key);
                        Ok(())
                    }
                    Err(retry_err) if retry_err.is_quota_exceeded() => {
                        error!(
                            "❌ Storage full: '{}' still does not fit (cleanup freed anything: {})",
                            key, freed
                        );
                        Err(StorageError::StorageFull {
                            key: key.to_string(),
                            bytes: value.chars().count(),
                        })
                    }
                    Err(retry_err) => {
                        error!("❌ Retry of '{}' failed: {}", key, retry_err);
                        Err(retry_err)
                    }
                }
            }
            Err(e) => {
                error!("❌ Failed to write '{}': {}", key, e);
                Err(e)
            }
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.store.get(key).await
    }

    pub async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        self.store.remove(key).await
    }

    /// Copy the entire namespace into memory
    pub async fn snapshot_namespace(&self) -> Result<NamespaceBackup, StorageError> {
        let entries: BTreeMap<String, String> = self
            .store
            .entries()
            .await?
            .into_iter()
            .filter(|(k, _)| k != PROBE_KEY)
            .collect();
        debug!("📦 Backed up {} keys", entries.len());

        Ok(NamespaceBackup {
            entries,
            taken_at: Utc::now(),
        })
    }

    /// Put the namespace back to exactly the contents of `backup`.
    ///
    /// Only ever invoked explicitly by a caller; imports do not restore on
    /// their own.
    pub async fn restore_namespace(&self, backup: &NamespaceBackup) -> Result<(), StorageError> {
        info!(
            "♻️ Restoring {} keys from backup taken at {}",
            backup.len(),
            backup.taken_at.to_rfc3339()
        );

        for (key, _) in self.store.entries().await? {
            if !backup.entries.contains_key(&key) {
                self.store.remove(&key).await?;
            }
        }
        for (key, value) in &backup.entries {
            self.store.set(key, value).await?;
        }

        Ok(())
    }
}

/// A stored JSON document that keeps the key order of every object in it
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum JsonNode {
    Object(OrderedMap<JsonNode>),
    Array(Vec<JsonNode>),
    Other(serde_json::Value),
}

/// Trim a date-keyed object, `None` when nothing had to go
fn trim_date_buckets(raw: &str, keep: usize) -> Result<Option<String>, serde_json::Error> {
    let mut buckets: OrderedMap<JsonNode> = serde_json::from_str(raw)?;
    if buckets.retain_most_recent(keep) {
        Ok(Some(serde_json::to_string(&buckets)?))
    } else {
        Ok(None)
    }
}

/// Trim the `history` object of every habit in a habit list.
///
/// Only `history` is touched; every other field and every mark is written
/// back as it was stored.
fn trim_habit_histories(raw: &str, keep: usize) -> Result<Option<String>, serde_json::Error> {
    let mut habits: Vec<JsonNode> = serde_json::from_str(raw)?;
    let mut trimmed = false;
    for habit in &mut habits {
        if let JsonNode::Object(fields) = habit {
            if let Some(JsonNode::Object(history)) = fields.get_mut("history") {
                trimmed |= history.retain_most_recent(keep);
            }
        }
    }

    if trimmed {
        Ok(Some(serde_json::to_string(&habits)?))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceTier;
    use crate::domain::models::Habit;
    use crate::storage::keys::{HABITS_DATA, HISTORY_PROTEIN, HISTORY_WATER, WORKOUT_HISTORY};
    use crate::storage::MemoryStore;

    fn quota(
        quota_bytes: usize,
        near_quota_threshold: f64,
        max_history_days: usize,
    ) -> QuotaConfig {
        QuotaConfig {
            quota_bytes,
            near_quota_threshold,
            max_history_days,
            max_import_bytes: quota_bytes,
        }
    }

    fn manager_with(store: &MemoryStore, quota: QuotaConfig) -> StorageManager {
        StorageManager::new(Arc::new(store.clone()), quota)
    }

    /// `{"2024-01-01":[{"amount":1}], ...}` with `days` consecutive January/February dates
    fn history_json(days: u32) -> String {
        let buckets: OrderedMap<serde_json::Value> = (0..days)
            .map(|i| {
                let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i64::from(i));
                (date.format("%Y-%m-%d").to_string(), serde_json::json!([{ "amount": i }]))
            })
            .collect();
        serde_json::to_string(&buckets).unwrap()
    }

    #[tokio::test]
    async fn test_is_available() {
        let store = MemoryStore::new();
        let manager = manager_with(&store, DeviceTier::Standard.quota_config());

        assert!(manager.is_available().await);
        assert!(store.get(PROBE_KEY).await.unwrap().is_none());

        store.set_unavailable(true);
        assert!(!manager.is_available().await);
    }

    #[tokio::test]
    async fn test_usage_and_remaining_space() {
        let store = MemoryStore::new();
        let manager = manager_with(&store, quota(100, 0.9, 30));

        store.set("goal_water", "2000").await.unwrap(); // 10 + 4
        store.set("app_theme", "dark").await.unwrap(); // 9 + 4

        assert_eq!(manager.usage().await, 27);
        assert_eq!(manager.remaining_space().await, 73);
    }

    #[tokio::test]
    async fn test_usage_of_unreadable_namespace_is_zero() {
        let store = MemoryStore::new();
        store.set("goal_water", "2000").await.unwrap();
        store.set_unavailable(true);

        let manager = manager_with(&store, quota(100, 0.9, 30));
        assert_eq!(manager.usage().await, 0);
        assert!(!manager.is_near_quota().await);
    }

    #[tokio::test]
    async fn test_near_quota_boundary() {
        let store = MemoryStore::new();
        let manager = manager_with(&store, quota(1000, 0.9, 30));

        // key "k" (1) + 898 characters = 899, one below the 900 boundary
        store.set("k", &"x".repeat(898)).await.unwrap();
        assert!(!manager.is_near_quota().await);

        store.set("k", &"x".repeat(899)).await.unwrap();
        assert!(manager.is_near_quota().await);

        store.set("k", &"x".repeat(950)).await.unwrap();
        assert!(manager.is_near_quota().await);
    }

    #[tokio::test]
    async fn test_cleanup_bounds_constrained_history() {
        let store = MemoryStore::new();
        let manager = manager_with(&store, DeviceTier::Constrained.quota_config());

        store.set(HISTORY_WATER, &history_json(45)).await.unwrap();
        store.set(WORKOUT_HISTORY, &history_json(31)).await.unwrap();
        store.set(HISTORY_PROTEIN, &history_json(10)).await.unwrap();

        assert!(manager.cleanup_old_data().await);

        for key in [HISTORY_WATER, WORKOUT_HISTORY, HISTORY_PROTEIN] {
            let raw = store.get(key).await.unwrap().unwrap();
            let buckets: OrderedMap<serde_json::Value> = serde_json::from_str(&raw).unwrap();
            assert!(buckets.len() <= 30, "{} kept {} dates", key, buckets.len());
        }

        let raw = store.get(HISTORY_WATER).await.unwrap().unwrap();
        let buckets: OrderedMap<serde_json::Value> = serde_json::from_str(&raw).unwrap();
        // 45 days from 2024-01-01 end on 2024-02-14; the first kept is 2024-01-16
        assert_eq!(buckets.keys().next(), Some("2024-01-16"));
        assert_eq!(buckets.keys().last(), Some("2024-02-14"));

        // Untrimmed key left byte-identical
        assert_eq!(store.get(HISTORY_PROTEIN).await.unwrap().unwrap(), history_json(10));
    }

    #[tokio::test]
    async fn test_cleanup_trims_habit_histories() {
        let store = MemoryStore::new();
        let manager = manager_with(&store, quota(1000, 0.9, 2));

        store
            .set(
                HABITS_DATA,
                r##"[{"name":"Read","color":"#000","history":{"2024-01-01":true,"2024-01-03":true,"2024-01-02":false}},{"history":{}}]"##,
            )
            .await
            .unwrap();

        assert!(manager.cleanup_old_data().await);

        let habits: Vec<Habit> =
            serde_json::from_str(&store.get(HABITS_DATA).await.unwrap().unwrap()).unwrap();
        assert_eq!(habits.len(), 2);
        assert_eq!(
            habits[0].history.keys().collect::<Vec<_>>(),
            vec!["2024-01-03", "2024-01-02"]
        );
        assert!(habits[1].is_placeholder());
    }

    #[tokio::test]
    async fn test_cleanup_keeps_unknown_habit_fields_and_marks() {
        let store = MemoryStore::new();
        let manager = manager_with(&store, quota(1000, 0.9, 2));

        store
            .set(
                HABITS_DATA,
                r##"[{"name":"Read","color":"#000","icon":"book","history":{"2024-01-01":1,"2024-01-02":true,"2024-01-03":"half","2024-01-04":false}}]"##,
            )
            .await
            .unwrap();

        assert!(manager.cleanup_old_data().await);
        assert_eq!(
            store.get(HABITS_DATA).await.unwrap().as_deref(),
            Some(r##"[{"name":"Read","color":"#000","icon":"book","history":{"2024-01-03":"half","2024-01-04":false}}]"##)
        );
    }

    #[tokio::test]
    async fn test_cleanup_skips_corrupt_keys_and_continues() {
        let store = MemoryStore::new();
        let manager = manager_with(&store, quota(100_000, 0.9, 5));

        store.set(HISTORY_WATER, "{not json").await.unwrap();
        store.set(HISTORY_PROTEIN, &history_json(8)).await.unwrap();

        assert!(manager.cleanup_old_data().await);
        assert_eq!(store.get(HISTORY_WATER).await.unwrap().as_deref(), Some("{not json"));

        let buckets: OrderedMap<serde_json::Value> =
            serde_json::from_str(&store.get(HISTORY_PROTEIN).await.unwrap().unwrap()).unwrap();
        assert_eq!(buckets.len(), 5);
    }

    #[tokio::test]
    async fn test_cleanup_without_history_frees_nothing() {
        let store = MemoryStore::new();
        let manager = manager_with(&store, DeviceTier::Standard.quota_config());

        store.set(HISTORY_WATER, &history_json(3)).await.unwrap();
        assert!(!manager.cleanup_old_data().await);
    }

    #[tokio::test]
    async fn test_safe_write_recovers_by_cleaning_up() {
        let history = history_json(20);
        let capacity = HISTORY_WATER.len() + history.len() + 20;
        let store = MemoryStore::with_capacity(capacity);
        let manager = manager_with(&store, quota(capacity, 0.9, 2));

        store.set(HISTORY_WATER, &history).await.unwrap();

        // Does not fit until the 20 days of history shrink to 2
        manager.safe_write("app_theme", &"d".repeat(40)).await.unwrap();

        assert_eq!(store.get("app_theme").await.unwrap().map(|v| v.len()), Some(40));
        let buckets: OrderedMap<serde_json::Value> =
            serde_json::from_str(&store.get(HISTORY_WATER).await.unwrap().unwrap()).unwrap();
        assert_eq!(buckets.len(), 2);
    }

    #[tokio::test]
    async fn test_safe_write_reports_storage_full() {
        let store = MemoryStore::with_capacity(50);
        let manager = manager_with(&store, quota(50, 0.9, 2));

        let err = manager.safe_write("app_theme", &"d".repeat(100)).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::StorageFull { ref key, bytes: 100 } if key == "app_theme"
        ));
        assert!(store.get("app_theme").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_safe_write_passes_through_other_failures() {
        let store = MemoryStore::new();
        let manager = manager_with(&store, DeviceTier::Standard.quota_config());
        store.set_unavailable(true);

        let err = manager.safe_write("app_theme", "dark").await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_backup_and_restore_namespace() {
        let store = MemoryStore::new();
        let manager = manager_with(&store, DeviceTier::Standard.quota_config());

        store.set("goal_water", "2000").await.unwrap();
        store.set("app_theme", "dark").await.unwrap();
        let backup = manager.snapshot_namespace().await.unwrap();
        assert_eq!(backup.len(), 2);

        store.set("goal_water", "1500").await.unwrap();
        store.set("habits_data", "[]").await.unwrap();

        manager.restore_namespace(&backup).await.unwrap();

        assert_eq!(store.get("goal_water").await.unwrap().as_deref(), Some("2000"));
        assert_eq!(store.get("app_theme").await.unwrap().as_deref(), Some("dark"));
        assert!(store.get("habits_data").await.unwrap().is_none());
    }
}
