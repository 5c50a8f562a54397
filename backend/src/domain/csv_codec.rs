//! # CSV Codec
//!
//! Pure, stateless conversion between a [`HealthSnapshot`] and one flat CSV
//! table. Every row kind shares the same 12 columns and fills only the ones it
//! needs; the rest stay empty.
//!
//! ```csv
//! data_type,key,value,date,amount,timestamp,type,count,name,color,completed,order
//! meta,version,3.0,,,,,,,,,
//! water,goal,2000,,,,,,,,,
//! water_history,2024-01-01_0,,2024-01-01,250,2024-01-01T08:00:00Z,,,,,,
//! workout_state,pushups,,,,,pushups,,,,true,0
//! habit,0,,,,,,,Read,#2196f3,,
//! habit_history,0_2024-01-01,true,2024-01-01,,,,,,,,
//! settings,theme,dark,,,,,,,,,
//! ```
//!
//! | data_type         | columns used                                   |
//! |-------------------|------------------------------------------------|
//! | `meta`            | key (`version`, `export_date`), value          |
//! | `water`/`protein` | key (`goal`, `intake`), value                  |
//! | `*_history`       | key (`{date}_{index}`), date, amount, timestamp |
//! | `workout_state`   | key, type, completed, order                    |
//! | `workout_count`   | key, type, count                               |
//! | `workout_history` | key (`{date}_{index}`), date, type, count, timestamp |
//! | `habit`           | key (habit index), name, color                 |
//! | `habit_history`   | key (`{index}_{date}`), value (mark), date     |
//! | `settings`        | key (`theme`, `reminder`), value               |
//!
//! Rows are split on line boundaries before fields are tokenized, so a quoted
//! field containing a newline cannot be read back. The serializer still quotes
//! such fields; the parser reads them up to the line break only.

use std::borrow::Cow;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

use super::models::{
    parse_int, slot_at, HabitMark, HealthSnapshot, HistoryEntry, IntakeDomain, WorkoutHistoryEntry,
    WorkoutState, MAX_HABIT_INDEX,
};

/// Column names, in the order they are written
pub const CSV_HEADER: [&str; 12] = [
    "data_type",
    "key",
    "value",
    "date",
    "amount",
    "timestamp",
    "type",
    "count",
    "name",
    "color",
    "completed",
    "order",
];

/// Format version written into the `meta` rows
pub const EXPORT_VERSION: &str = "3.0";

#[derive(Debug, Error, PartialEq)]
pub enum CsvParseError {
    #[error("The file has no data rows")]
    NoDataRows,
    #[error("The header is missing the '{0}' column")]
    MissingColumn(String),
    #[error("The file contains no recognizable health tracker rows")]
    NoRecognizedRows,
    #[error("The file is not valid UTF-8 text")]
    InvalidEncoding,
}

/// One row of the table. `None` is an empty cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvRecord {
    pub data_type: String,
    pub key: Option<String>,
    pub value: Option<String>,
    pub date: Option<String>,
    pub amount: Option<String>,
    pub timestamp: Option<String>,
    pub record_type: Option<String>,
    pub count: Option<String>,
    pub name: Option<String>,
    pub color: Option<String>,
    pub completed: Option<String>,
    pub order: Option<String>,
}

impl CsvRecord {
    fn new(data_type: &str) -> Self {
        Self {
            data_type: data_type.to_string(),
            ..Self::default()
        }
    }

    fn keyed(data_type: &str, key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::new(data_type)
        }
    }

    /// Cells in [`CSV_HEADER`] order
    fn cells(&self) -> [Option<&str>; 12] {
        [
            Some(self.data_type.as_str()),
            self.key.as_deref(),
            self.value.as_deref(),
            self.date.as_deref(),
            self.amount.as_deref(),
            self.timestamp.as_deref(),
            self.record_type.as_deref(),
            self.count.as_deref(),
            self.name.as_deref(),
            self.color.as_deref(),
            self.completed.as_deref(),
            self.order.as_deref(),
        ]
    }

    fn from_cells(columns: &ColumnIndex, cells: &[String]) -> Self {
        let cell = |name: &str| columns.cell(cells, name).map(str::to_string);
        Self {
            data_type: cell("data_type").unwrap_or_default(),
            key: cell("key"),
            value: cell("value"),
            date: cell("date"),
            amount: cell("amount"),
            timestamp: cell("timestamp"),
            record_type: cell("type"),
            count: cell("count"),
            name: cell("name"),
            color: cell("color"),
            completed: cell("completed"),
            order: cell("order"),
        }
    }
}

fn int_cell(value: Option<i64>) -> Option<String> {
    value.map(|v| v.to_string())
}

/// Quote a field if and only if it contains a comma, a double quote or a
/// newline, doubling any quotes inside.
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains(&[',', '"', '\n'][..]) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Split one line into fields. Commas inside quotes are data; a doubled quote
/// inside quotes is one literal quote.
pub fn tokenize_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    fields.push(current);
    fields
}

fn encode_row(record: &CsvRecord) -> String {
    record
        .cells()
        .iter()
        .map(|cell| escape_field(cell.unwrap_or("")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Flatten a snapshot into records, in export order
pub fn snapshot_to_records(snapshot: &HealthSnapshot) -> Vec<CsvRecord> {
    let mut records = Vec::new();

    if let Some(version) = &snapshot.meta.version {
        records.push(CsvRecord {
            value: Some(version.clone()),
            ..CsvRecord::keyed("meta", "version")
        });
    }
    if let Some(exported_at) = &snapshot.meta.exported_at {
        records.push(CsvRecord {
            value: Some(exported_at.clone()),
            ..CsvRecord::keyed("meta", "export_date")
        });
    }

    for domain in IntakeDomain::ALL {
        let data = snapshot.intake(domain);
        if data.goal.is_some() {
            records.push(CsvRecord {
                value: int_cell(data.goal),
                ..CsvRecord::keyed(domain.tag(), "goal")
            });
        }
        if data.intake.is_some() {
            records.push(CsvRecord {
                value: int_cell(data.intake),
                ..CsvRecord::keyed(domain.tag(), "intake")
            });
        }
        for (date, entries) in data.history.iter() {
            for (index, entry) in entries.iter().enumerate() {
                records.push(CsvRecord {
                    date: Some(date.to_string()),
                    amount: int_cell(entry.amount),
                    timestamp: entry.timestamp.clone(),
                    ..CsvRecord::keyed(domain.history_tag(), format!("{}_{}", date, index))
                });
            }
        }
    }

    let workouts = &snapshot.workouts;
    for (workout_type, state) in workouts.state.iter() {
        records.push(CsvRecord {
            record_type: Some(workout_type.to_string()),
            completed: Some(state.completed.to_string()),
            order: int_cell(state.order),
            ..CsvRecord::keyed("workout_state", workout_type)
        });
    }
    for (workout_type, count) in workouts.counts.iter() {
        records.push(CsvRecord {
            record_type: Some(workout_type.to_string()),
            count: int_cell(*count),
            ..CsvRecord::keyed("workout_count", workout_type)
        });
    }
    for (date, entries) in workouts.history.iter() {
        for (index, entry) in entries.iter().enumerate() {
            records.push(CsvRecord {
                date: Some(date.to_string()),
                record_type: entry.workout_type.clone(),
                count: int_cell(entry.count),
                timestamp: entry.timestamp.clone(),
                ..CsvRecord::keyed("workout_history", format!("{}_{}", date, index))
            });
        }
    }

    for (index, habit) in snapshot.habits.iter().enumerate() {
        records.push(CsvRecord {
            name: habit.name.clone(),
            color: habit.color.clone(),
            ..CsvRecord::keyed("habit", index.to_string())
        });
        for (date, mark) in habit.history.iter() {
            records.push(CsvRecord {
                value: Some(mark.to_string()),
                date: Some(date.to_string()),
                ..CsvRecord::keyed("habit_history", format!("{}_{}", index, date))
            });
        }
    }

    if let Some(theme) = &snapshot.settings.theme {
        records.push(CsvRecord {
            value: Some(theme.clone()),
            ..CsvRecord::keyed("settings", "theme")
        });
    }
    if let Some(reminder) = &snapshot.settings.reminder {
        records.push(CsvRecord {
            value: Some(reminder.clone()),
            ..CsvRecord::keyed("settings", "reminder")
        });
    }

    records
}

/// Render a snapshot as a CSV document: header plus one line per record,
/// joined with `\n` and without a trailing newline.
pub fn serialize_snapshot(snapshot: &HealthSnapshot) -> String {
    serialize_records(&snapshot_to_records(snapshot))
}

pub fn serialize_records(records: &[CsvRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CSV_HEADER.join(","));
    lines.extend(records.iter().map(encode_row));
    lines.join("\n")
}

/// Header name to column position
struct ColumnIndex(HashMap<String, usize>);

impl ColumnIndex {
    fn from_header(line: &str) -> Result<Self, CsvParseError> {
        let columns: HashMap<String, usize> = tokenize_row(line)
            .into_iter()
            .enumerate()
            .map(|(index, name)| (name.trim().to_string(), index))
            .collect();

        if !columns.contains_key("data_type") {
            return Err(CsvParseError::MissingColumn("data_type".to_string()));
        }
        Ok(Self(columns))
    }

    /// Non-empty cell of a named column. Missing columns and short rows read as empty.
    fn cell<'a>(&self, cells: &'a [String], name: &str) -> Option<&'a str> {
        let index = *self.0.get(name)?;
        cells
            .get(index)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Result of reading a CSV document
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCsv {
    pub snapshot: HealthSnapshot,
    /// Data rows in the file
    pub rows_read: usize,
    /// Rows with an unknown `data_type` or unusable keys
    pub rows_skipped: usize,
}

/// Decode raw bytes and parse them
pub fn parse_bytes(bytes: &[u8]) -> Result<ParsedCsv, CsvParseError> {
    let text = std::str::from_utf8(bytes).map_err(|_| CsvParseError::InvalidEncoding)?;
    parse_snapshot(text)
}

/// Rebuild a snapshot from a CSV document.
///
/// Fails when there is no data row, when the header lacks `data_type`, or
/// when not a single row is of a known kind. A file holding only `meta` rows
/// is valid and yields an otherwise empty snapshot.
pub fn parse_snapshot(text: &str) -> Result<ParsedCsv, CsvParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .collect();

    if lines.len() < 2 {
        return Err(CsvParseError::NoDataRows);
    }

    let columns = ColumnIndex::from_header(lines[0])?;
    let mut snapshot = HealthSnapshot::default();
    let mut rows_skipped = 0;

    for line in &lines[1..] {
        let cells = tokenize_row(line);
        let record = CsvRecord::from_cells(&columns, &cells);
        if !apply_record(&mut snapshot, &record) {
            rows_skipped += 1;
        }
    }

    let rows_read = lines.len() - 1;
    if rows_skipped == rows_read {
        return Err(CsvParseError::NoRecognizedRows);
    }

    debug!("Parsed {} rows ({} skipped)", rows_read, rows_skipped);
    Ok(ParsedCsv {
        snapshot,
        rows_read,
        rows_skipped,
    })
}

/// Date of a history row: the `date` column, else the `{date}_{index}` key
fn history_date(record: &CsvRecord) -> Option<String> {
    record.date.clone().or_else(|| {
        record
            .key
            .as_deref()
            .and_then(|key| key.rsplit_once('_'))
            .map(|(date, _)| date.to_string())
    })
}

fn habit_index(raw: &str) -> Option<usize> {
    match raw.trim().parse::<usize>() {
        Ok(index) if index <= MAX_HABIT_INDEX => Some(index),
        Ok(index) => {
            warn!("Skipping habit row with out-of-range index {}", index);
            None
        }
        Err(_) => None,
    }
}

/// Fold one record into the snapshot. Returns false if the row was skipped.
fn apply_record(snapshot: &mut HealthSnapshot, record: &CsvRecord) -> bool {
    let key = record.key.as_deref();

    match record.data_type.as_str() {
        "meta" => {
            match key {
                Some("version") => snapshot.meta.version = record.value.clone(),
                Some("export_date") => snapshot.meta.exported_at = record.value.clone(),
                _ => {}
            }
            true
        }
        tag @ ("water" | "protein") => {
            let domain = intake_domain(tag);
            let data = snapshot.intake_mut(domain);
            let amount = record.value.as_deref().and_then(parse_int);
            match key {
                Some("goal") => data.goal = amount,
                Some("intake") => data.intake = amount,
                _ => {}
            }
            true
        }
        tag @ ("water_history" | "protein_history") => {
            let Some(date) = history_date(record) else {
                warn!("Skipping {} row without a date", tag);
                return false;
            };
            let domain = intake_domain(tag.trim_end_matches("_history"));
            snapshot
                .intake_mut(domain)
                .history
                .get_or_insert_default(&date)
                .push(HistoryEntry {
                    amount: record.amount.as_deref().and_then(parse_int),
                    timestamp: record.timestamp.clone(),
                });
            true
        }
        "workout_state" => {
            let Some(workout_type) = record.record_type.as_deref().or(key) else {
                return false;
            };
            snapshot.workouts.state.insert(
                workout_type,
                WorkoutState {
                    completed: record.completed.as_deref() == Some("true"),
                    order: record.order.as_deref().and_then(parse_int),
                },
            );
            true
        }
        "workout_count" => {
            let Some(workout_type) = record.record_type.as_deref().or(key) else {
                return false;
            };
            snapshot
                .workouts
                .counts
                .insert(workout_type, record.count.as_deref().and_then(parse_int));
            true
        }
        "workout_history" => {
            let Some(date) = history_date(record) else {
                warn!("Skipping workout_history row without a date");
                return false;
            };
            snapshot
                .workouts
                .history
                .get_or_insert_default(&date)
                .push(WorkoutHistoryEntry {
                    workout_type: record.record_type.clone(),
                    count: record.count.as_deref().and_then(parse_int),
                    timestamp: record.timestamp.clone(),
                });
            true
        }
        "habit" => {
            let Some(index) = key.and_then(habit_index) else {
                return false;
            };
            let habit = slot_at(&mut snapshot.habits, index);
            habit.name = record.name.clone();
            habit.color = record.color.clone();
            true
        }
        "habit_history" => {
            let Some((raw_index, key_date)) = key.and_then(|k| k.split_once('_')) else {
                return false;
            };
            let Some(index) = habit_index(raw_index) else {
                return false;
            };
            let date = record.date.as_deref().unwrap_or(key_date);
            let mark = HabitMark::from_cell(record.value.as_deref().unwrap_or(""));
            slot_at(&mut snapshot.habits, index).history.insert(date, mark);
            true
        }
        "settings" => {
            match key {
                Some("theme") => snapshot.settings.theme = record.value.clone(),
                Some("reminder") => snapshot.settings.reminder = record.value.clone(),
                _ => {}
            }
            true
        }
        other => {
            debug!("Skipping row with unknown data_type '{}'", other);
            false
        }
    }
}

fn intake_domain(tag: &str) -> IntakeDomain {
    if tag == "protein" {
        IntakeDomain::Protein
    } else {
        IntakeDomain::Water
    }
}
