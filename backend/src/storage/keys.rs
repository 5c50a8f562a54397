//! Persisted key layout of the tracker namespace.

pub const GOAL_WATER: &str = "goal_water";
pub const GOAL_PROTEIN: &str = "goal_protein";
pub const INTAKE_WATER: &str = "intake_water";
pub const INTAKE_PROTEIN: &str = "intake_protein";
pub const HISTORY_WATER: &str = "history_water";
pub const HISTORY_PROTEIN: &str = "history_protein";
pub const WORKOUT_STATE: &str = "workout_state";
pub const WORKOUT_COUNT: &str = "workout_count";
pub const WORKOUT_HISTORY: &str = "workout_history";
pub const HABITS_DATA: &str = "habits_data";
pub const APP_THEME: &str = "app_theme";
pub const GLOBAL_REMINDER: &str = "global_reminder";

/// Throwaway key used by the availability probe
pub const PROBE_KEY: &str = "__storage_test__";

/// How the date-bucketed history inside a key is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryLayout {
    /// The value is itself a date-keyed object
    DateBuckets,
    /// The value is a habit list whose elements each carry a date-keyed `history`
    HabitList,
}

/// Keys that grow with time and are trimmed by cleanup
pub const HISTORY_KEYS: [(&str, HistoryLayout); 4] = [
    (HISTORY_WATER, HistoryLayout::DateBuckets),
    (HISTORY_PROTEIN, HistoryLayout::DateBuckets),
    (WORKOUT_HISTORY, HistoryLayout::DateBuckets),
    (HABITS_DATA, HistoryLayout::HabitList),
];
