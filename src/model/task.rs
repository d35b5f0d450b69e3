use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Task priority. Sorting by priority puts the heaviest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Numeric weight used for sorting and the tabular export
    pub fn weight(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Parse a priority name case-insensitively; anything unrecognized is medium.
    pub fn parse_lenient(s: &str) -> Priority {
        s.parse().unwrap_or_default()
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!(
                "invalid priority '{}' (expected high, medium or low)",
                other
            )),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single to-do record. Field names serialize in camelCase so the stored
/// and exported JSON keeps the `dueDate` / `createdAt` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique, immutable identifier
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    /// Calendar date only, no time component
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed: bool,
    /// Position in the manual ordering
    #[serde(default)]
    pub order: usize,
}

impl Task {
    /// Overdue is derived, never stored: a due date strictly before `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date.is_some_and(|d| d < today)
    }
}

/// Fields supplied when creating a task. The due date is raw user text and
/// is validated along with the rest.
#[derive(Debug, Clone, Default)]
pub struct TaskInput {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<String>,
}

impl TaskInput {
    pub fn new(title: impl Into<String>) -> Self {
        TaskInput {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn due(mut self, due: impl Into<String>) -> Self {
        self.due_date = Some(due.into());
        self
    }
}

/// Partial update. `None` leaves a field untouched; `due_date: Some(None)`
/// clears the due date.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<String>>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.completed.is_none()
    }
}

/// A record decoded from an import file, before it is merged into the list.
/// Incoming ids are never carried over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    /// Kept from JSON imports when present; tabular imports use the merge time
    pub created_at: Option<DateTime<Utc>>,
}

impl ImportRecord {
    pub fn from_task(task: &Task) -> Self {
        ImportRecord {
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            due_date: task.due_date,
            completed: task.completed,
            created_at: Some(task.created_at),
        }
    }
}

/// Parse a calendar date from user or file text.
///
/// Accepts `YYYY-MM-DD`, an RFC 3339 timestamp (its UTC date is used) and
/// `MM/DD/YYYY`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    NaiveDate::parse_from_str(s, "%m/%d/%Y").ok()
}
