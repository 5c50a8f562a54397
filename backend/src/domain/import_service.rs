//! Import of a previously exported CSV file back into storage.
//!
//! An import runs these steps in order and stops at the first failure:
//!
//! 1. reject files over the tier's size ceiling or not declared as CSV
//! 2. parse (a malformed file never touches storage)
//! 3. estimate the stored size and refuse imports above 90% of the quota
//! 4. require explicit confirmation from the caller
//! 5. back up the whole namespace in memory
//! 6. write each field through [`StorageManager::safe_write`]
//!
//! A failed write aborts the remaining ones and leaves whatever was already
//! written in place. The backup is handed back inside
//! [`ImportError::FieldWrite`] and is only applied if the caller passes it to
//! [`StorageManager::restore_namespace`].

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::csv_codec::{parse_bytes, CsvParseError, ParsedCsv};
use super::export_service::{goal_key, history_key, intake_key};
use super::models::{HealthSnapshot, IntakeDomain};
use crate::config::QuotaConfig;
use crate::storage::traits::entry_size;
use crate::storage::{keys, NamespaceBackup, StorageError, StorageManager};

/// Share of the quota an import may occupy
pub const IMPORT_QUOTA_FRACTION: f64 = 0.9;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("The file is too large ({size} bytes); the limit is {limit} bytes")]
    Oversize { size: usize, limit: usize },

    #[error("'{0}' is not a CSV file")]
    UnsupportedFileType(String),

    #[error("The file could not be read: {0}")]
    Parse(#[from] CsvParseError),

    #[error("The imported data needs about {estimated} characters but only {limit} are allowed")]
    ImportTooLarge { estimated: usize, limit: usize },

    #[error("Importing replaces your current data and must be confirmed")]
    ConfirmationRequired,

    #[error("Storage error during import: {0}")]
    Storage(#[from] StorageError),

    /// Earlier fields stay written. `backup` holds the namespace as it was
    /// before the first write.
    #[error("Failed to import {field}: {source}")]
    FieldWrite {
        field: String,
        key: String,
        source: StorageError,
        backup: Box<NamespaceBackup>,
    },
}

impl ImportError {
    /// Stable kind tag used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            ImportError::Oversize { .. } => "oversize",
            ImportError::UnsupportedFileType(_) => "unsupported_file_type",
            ImportError::Parse(_) => "parse_error",
            ImportError::ImportTooLarge { .. } => "import_too_large",
            ImportError::ConfirmationRequired => "confirmation_required",
            ImportError::Storage(e) => e.kind(),
            ImportError::FieldWrite { .. } => "field_write_failed",
        }
    }
}

/// An uploaded file as received from the client
#[derive(Debug, Clone, Default)]
pub struct ImportFile {
    pub filename: Option<String>,
    /// Declared media type, e.g. `text/csv; charset=utf-8`
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImportFile {
    fn display_name(&self) -> String {
        self.filename
            .clone()
            .or_else(|| self.content_type.clone())
            .unwrap_or_else(|| "unnamed file".to_string())
    }

    /// A declared `text/csv` type or a `.csv` extension is enough
    pub fn is_csv(&self) -> bool {
        let declared = self.content_type.as_deref().is_some_and(|content_type| {
            content_type
                .split(';')
                .next()
                .is_some_and(|media| media.trim().eq_ignore_ascii_case("text/csv"))
        });
        let inferred = self
            .filename
            .as_deref()
            .is_some_and(|name| name.to_ascii_lowercase().ends_with(".csv"));

        declared || inferred
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    /// Storage keys written, in write order
    pub keys_written: Vec<String>,
    pub rows_read: usize,
    pub rows_skipped: usize,
}

/// One storage write derived from the parsed snapshot
#[derive(Debug, Clone, PartialEq)]
struct PlannedWrite {
    field: String,
    key: &'static str,
    value: String,
}

#[derive(Clone, Default)]
pub struct ImportService {
    /// Imports never interleave
    import_lock: Arc<Mutex<()>>,
}

impl ImportService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size and type checks, done before any parsing
    pub fn validate_file(&self, file: &ImportFile, quota: &QuotaConfig) -> Result<(), ImportError> {
        if file.bytes.len() > quota.max_import_bytes {
            return Err(ImportError::Oversize {
                size: file.bytes.len(),
                limit: quota.max_import_bytes,
            });
        }
        if !file.is_csv() {
            return Err(ImportError::UnsupportedFileType(file.display_name()));
        }
        Ok(())
    }

    pub async fn import(
        &self,
        storage: &StorageManager,
        file: ImportFile,
        confirmed: bool,
    ) -> Result<ImportReport, ImportError> {
        let _guard = self.import_lock.lock().await;
        info!("📥 IMPORT: Received {} ({} bytes)", file.display_name(), file.bytes.len());

        let quota = *storage.quota();
        self.validate_file(&file, &quota)?;

        let ParsedCsv {
            snapshot,
            rows_read,
            rows_skipped,
        } = parse_bytes(&file.bytes).map_err(|e| {
            warn!("⚠️ IMPORT: Rejected unparseable file: {}", e);
            ImportError::Parse(e)
        })?;
        info!("📥 IMPORT: Parsed {} rows ({} skipped)", rows_read, rows_skipped);

        let writes = plan_writes(&snapshot)?;
        let estimated: usize = writes.iter().map(|w| entry_size(w.key, &w.value)).sum();
        let limit = (quota.quota_bytes as f64 * IMPORT_QUOTA_FRACTION) as usize;
        if estimated > limit {
            warn!("⚠️ IMPORT: Estimated size {} exceeds limit {}", estimated, limit);
            return Err(ImportError::ImportTooLarge { estimated, limit });
        }

        if !confirmed {
            info!("📥 IMPORT: Waiting for confirmation before overwriting {} keys", writes.len());
            return Err(ImportError::ConfirmationRequired);
        }

        let backup = storage.snapshot_namespace().await?;
        info!("📦 IMPORT: Backed up {} existing keys", backup.len());

        let mut keys_written = Vec::with_capacity(writes.len());
        for write in writes {
            if let Err(source) = storage.safe_write(write.key, &write.value).await {
                error!(
                    "❌ IMPORT: Failed writing {} after {} successful writes: {}",
                    write.field,
                    keys_written.len(),
                    source
                );
                return Err(ImportError::FieldWrite {
                    field: write.field,
                    key: write.key.to_string(),
                    source,
                    backup: Box::new(backup),
                });
            }
            keys_written.push(write.key.to_string());
        }

        info!("✅ IMPORT: Wrote {} keys", keys_written.len());
        Ok(ImportReport {
            keys_written,
            rows_read,
            rows_skipped,
        })
    }
}

/// Storage writes for every field present in the snapshot. Absent fields
/// leave their keys untouched.
fn plan_writes(snapshot: &HealthSnapshot) -> Result<Vec<PlannedWrite>, ImportError> {
    let mut writes = Vec::new();

    for domain in IntakeDomain::ALL {
        let data = snapshot.intake(domain);
        let tag = domain.tag();

        if let Some(goal) = data.goal {
            writes.push(planned(format!("{}.goal", tag), goal_key(domain), goal.to_string()));
        }
        if let Some(intake) = data.intake {
            writes.push(planned(format!("{}.intake", tag), intake_key(domain), intake.to_string()));
        }
        if !data.history.is_empty() {
            let field = format!("{}.history", tag);
            let value = encode(&field, &data.history)?;
            writes.push(planned(field, history_key(domain), value));
        }
    }

    let workouts = &snapshot.workouts;
    if !workouts.state.is_empty() {
        let value = encode("workouts.state", &workouts.state)?;
        writes.push(planned("workouts.state".to_string(), keys::WORKOUT_STATE, value));
    }
    if !workouts.counts.is_empty() {
        let value = encode("workouts.counts", &workouts.counts)?;
        writes.push(planned("workouts.counts".to_string(), keys::WORKOUT_COUNT, value));
    }
    if !workouts.history.is_empty() {
        let value = encode("workouts.history", &workouts.history)?;
        writes.push(planned("workouts.history".to_string(), keys::WORKOUT_HISTORY, value));
    }

    if !snapshot.habits.is_empty() {
        let value = encode("habits", &snapshot.habits)?;
        writes.push(planned("habits".to_string(), keys::HABITS_DATA, value));
    }

    if let Some(theme) = &snapshot.settings.theme {
        writes.push(planned("settings.theme".to_string(), keys::APP_THEME, theme.clone()));
    }
    if let Some(reminder) = &snapshot.settings.reminder {
        writes.push(planned(
            "settings.reminder".to_string(),
            keys::GLOBAL_REMINDER,
            reminder.clone(),
        ));
    }

    Ok(writes)
}

fn planned(field: String, key: &'static str, value: String) -> PlannedWrite {
    PlannedWrite { field, key, value }
}

fn encode<T: Serialize>(field: &str, value: &T) -> Result<String, ImportError> {
    serde_json::to_string(value).map_err(|e| {
        ImportError::Storage(StorageError::Backend(format!("could not encode {}: {}", field, e)))
    })
}
