//! Logical schema of the tracker data that backups must preserve.

pub mod habit;
pub mod numeric;
pub mod ordered_map;
pub mod snapshot;

pub use habit::{slot_at, Habit, HabitMark, MAX_HABIT_INDEX};
pub use numeric::parse_int;
pub use ordered_map::OrderedMap;
pub use snapshot::{
    DateBuckets, ExportMeta, HealthSnapshot, HistoryEntry, IntakeData, IntakeDomain, Settings,
    WorkoutData, WorkoutHistoryEntry, WorkoutState,
};
