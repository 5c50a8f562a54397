use serde::{Deserialize, Serialize};

use super::habit::Habit;
use super::numeric::deserialize_lenient_int;
use super::OrderedMap;

/// Date (`YYYY-MM-DD`) to the ordered entries recorded that day
pub type DateBuckets<T> = OrderedMap<Vec<T>>;

/// One logged water or protein intake
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<i64>,
    /// ISO-8601 instant the entry was logged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Goal, today's running total and history for one intake domain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntakeData {
    pub goal: Option<i64>,
    pub intake: Option<i64>,
    pub history: DateBuckets<HistoryEntry>,
}

/// Whether a workout type is done today and where it is displayed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutState {
    #[serde(default)]
    pub completed: bool,
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub order: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutHistoryEntry {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub workout_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkoutData {
    /// Workout type to its state
    pub state: OrderedMap<WorkoutState>,
    /// Workout type to its cumulative counter
    pub counts: OrderedMap<Option<i64>>,
    pub history: DateBuckets<WorkoutHistoryEntry>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub theme: Option<String>,
    /// Reminder configuration, carried as an opaque string
    pub reminder: Option<String>,
}

/// Export metadata carried in the `meta` rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportMeta {
    pub version: Option<String>,
    pub exported_at: Option<String>,
}

/// Every domain entity read from storage at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthSnapshot {
    pub meta: ExportMeta,
    pub water: IntakeData,
    pub protein: IntakeData,
    pub workouts: WorkoutData,
    pub habits: Vec<Habit>,
    pub settings: Settings,
}

/// The two intake domains sharing the goal/intake/history layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeDomain {
    Water,
    Protein,
}

impl IntakeDomain {
    pub const ALL: [IntakeDomain; 2] = [IntakeDomain::Water, IntakeDomain::Protein];

    /// `data_type` tag of the goal/intake rows, also the storage key suffix
    pub fn tag(self) -> &'static str {
        match self {
            IntakeDomain::Water => "water",
            IntakeDomain::Protein => "protein",
        }
    }

    /// `data_type` tag of the history rows
    pub fn history_tag(self) -> &'static str {
        match self {
            IntakeDomain::Water => "water_history",
            IntakeDomain::Protein => "protein_history",
        }
    }
}

impl HealthSnapshot {
    pub fn intake(&self, domain: IntakeDomain) -> &IntakeData {
        match domain {
            IntakeDomain::Water => &self.water,
            IntakeDomain::Protein => &self.protein,
        }
    }

    pub fn intake_mut(&mut self, domain: IntakeDomain) -> &mut IntakeData {
        match domain {
            IntakeDomain::Water => &mut self.water,
            IntakeDomain::Protein => &mut self.protein,
        }
    }
}
