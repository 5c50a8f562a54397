use serde::{Deserialize, Serialize};
use std::fmt;

use super::OrderedMap;

/// Highest habit index an import may address. Rows beyond it are skipped so a
/// single bogus row cannot force millions of placeholder habits.
pub const MAX_HABIT_INDEX: usize = 1000;

/// A tracked habit. Identity is its position in the habit list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Hex color, e.g. `#4caf50`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Date (`YYYY-MM-DD`) to completion mark
    #[serde(default)]
    pub history: OrderedMap<HabitMark>,
}

impl Habit {
    /// The empty habit used to pad sparse indices
    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn is_placeholder(&self) -> bool {
        self.name.is_none() && self.color.is_none() && self.history.is_empty()
    }
}

/// Per-day status of a habit. The trackers store booleans, but any other
/// marker is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HabitMark {
    Flag(bool),
    Text(String),
}

impl HabitMark {
    /// Decode a CSV cell: `true`/`false` become flags, anything else stays text.
    ///
    /// A text mark spelled `"true"` or `"false"` exports as the same cell as
    /// the flag, so it is read back as [`HabitMark::Flag`].
    pub fn from_cell(cell: &str) -> Self {
        match cell {
            "true" => HabitMark::Flag(true),
            "false" => HabitMark::Flag(false),
            other => HabitMark::Text(other.to_string()),
        }
    }
}

impl fmt::Display for HabitMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HabitMark::Flag(flag) => write!(f, "{}", flag),
            HabitMark::Text(text) => f.write_str(text),
        }
    }
}

/// Mutable access to `items[index]`, growing the sequence with default values
/// first when it is too short.
///
/// Existing elements are never moved or overwritten by the padding, so a row
/// for a higher index arriving before a lower one leaves both in place.
pub fn slot_at<T: Default>(items: &mut Vec<T>, index: usize) -> &mut T {
    if items.len() <= index {
        items.resize_with(index + 1, T::default);
    }
    &mut items[index]
}
