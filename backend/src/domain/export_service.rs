//! Export of the full tracker snapshot as a downloadable CSV file.
//!
//! The snapshot is read fresh from storage on every export. A key that cannot
//! be read or parsed is exported as empty; it never fails the export.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use shared::ExportDataResponse;

use super::csv_codec::{serialize_records, snapshot_to_records, EXPORT_VERSION};
use super::models::{parse_int, ExportMeta, HealthSnapshot, IntakeDomain};
use crate::storage::keys;
use crate::storage::StorageManager;

pub const EXPORT_MIME_TYPE: &str = "text/csv";

/// `health-tracker-export-YYYY-MM-DD.csv`
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("health-tracker-export-{}.csv", now.format("%Y-%m-%d"))
}

pub(crate) fn goal_key(domain: IntakeDomain) -> &'static str {
    match domain {
        IntakeDomain::Water => keys::GOAL_WATER,
        IntakeDomain::Protein => keys::GOAL_PROTEIN,
    }
}

pub(crate) fn intake_key(domain: IntakeDomain) -> &'static str {
    match domain {
        IntakeDomain::Water => keys::INTAKE_WATER,
        IntakeDomain::Protein => keys::INTAKE_PROTEIN,
    }
}

pub(crate) fn history_key(domain: IntakeDomain) -> &'static str {
    match domain {
        IntakeDomain::Water => keys::HISTORY_WATER,
        IntakeDomain::Protein => keys::HISTORY_PROTEIN,
    }
}

#[derive(Clone, Default)]
pub struct ExportService {}

impl ExportService {
    pub fn new() -> Self {
        Self {}
    }

    /// Read every tracker key into a snapshot, degrading unreadable keys to empty
    pub async fn load_snapshot(&self, storage: &StorageManager) -> HealthSnapshot {
        let mut snapshot = HealthSnapshot::default();

        for domain in IntakeDomain::ALL {
            let data = snapshot.intake_mut(domain);
            data.goal = read_int(storage, goal_key(domain)).await;
            data.intake = read_int(storage, intake_key(domain)).await;
            data.history = read_json(storage, history_key(domain)).await;
        }

        snapshot.workouts.state = read_json(storage, keys::WORKOUT_STATE).await;
        snapshot.workouts.counts = read_json(storage, keys::WORKOUT_COUNT).await;
        snapshot.workouts.history = read_json(storage, keys::WORKOUT_HISTORY).await;
        snapshot.habits = read_json(storage, keys::HABITS_DATA).await;
        snapshot.settings.theme = read_raw(storage, keys::APP_THEME).await;
        snapshot.settings.reminder = read_raw(storage, keys::GLOBAL_REMINDER).await;

        snapshot
    }

    pub async fn export_csv(&self, storage: &StorageManager) -> ExportDataResponse {
        self.export_csv_at(storage, Utc::now()).await
    }

    /// Export with an explicit clock, used for the `meta` row and the file name
    pub async fn export_csv_at(
        &self,
        storage: &StorageManager,
        now: DateTime<Utc>,
    ) -> ExportDataResponse {
        info!("📄 EXPORT: Reading snapshot from storage");

        let mut snapshot = self.load_snapshot(storage).await;
        snapshot.meta = ExportMeta {
            version: Some(EXPORT_VERSION.to_string()),
            exported_at: Some(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        };

        let records = snapshot_to_records(&snapshot);
        let csv_content = serialize_records(&records);
        let response = ExportDataResponse {
            filename: export_filename(now),
            mime_type: EXPORT_MIME_TYPE.to_string(),
            row_count: records.len(),
            csv_content,
        };

        info!(
            "✅ EXPORT: Generated {} rows ({} bytes) as {}",
            response.row_count,
            response.csv_content.len(),
            response.filename
        );
        response
    }
}

async fn read_raw(storage: &StorageManager, key: &str) -> Option<String> {
    match storage.get(key).await {
        Ok(value) => value,
        Err(e) => {
            warn!("⚠️ EXPORT: Could not read '{}', exporting it as empty: {}", key, e);
            None
        }
    }
}

async fn read_int(storage: &StorageManager, key: &str) -> Option<i64> {
    let raw = read_raw(storage, key).await?;
    let value = parse_int(&raw);
    if value.is_none() {
        warn!("⚠️ EXPORT: '{}' is not a number ({:?}), exporting it as empty", key, raw);
    }
    value
}

async fn read_json<T: DeserializeOwned + Default>(storage: &StorageManager, key: &str) -> T {
    let Some(raw) = read_raw(storage, key).await else {
        return T::default();
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("⚠️ EXPORT: '{}' is corrupt, exporting it as empty: {}", key, e);
            T::default()
        }
    }
}
