// Data models for the task board

use crate::filter::Filters;
use chrono::NaiveDate;
use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflow stage a task sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Backlog,
    Todo,
    InProgress,
    Done,
}

impl Column {
    /// All columns in board order (left to right)
    pub const ALL: [Column; 4] = [Column::Backlog, Column::Todo, Column::InProgress, Column::Done];

    /// Wire name, as stored in the persisted document
    pub fn as_str(self) -> &'static str {
        match self {
            Column::Backlog => "backlog",
            Column::Todo => "todo",
            Column::InProgress => "inprogress",
            Column::Done => "done",
        }
    }

    /// Human-readable heading
    pub fn label(self) -> &'static str {
        match self {
            Column::Backlog => "Backlog",
            Column::Todo => "To Do",
            Column::InProgress => "In Progress",
            Column::Done => "Done",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Column {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        Column::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| eyre!("Unknown column: {} (expected backlog, todo, inprogress or done)", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Normal, Priority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| eyre!("Unknown priority: {} (expected low, normal or high)", s))
    }
}

/// A work item on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub assignee: String,
    pub priority: Priority,
    /// `YYYY-MM-DD`, or empty when the task has no due date
    pub due: String,
    pub column: Column,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    /// Parsed due date, if one is set and well-formed
    pub fn due_date(&self) -> Option<NaiveDate> {
        let due = self.due.trim();
        if due.is_empty() {
            return None;
        }
        NaiveDate::parse_from_str(due, "%Y-%m-%d").ok()
    }

    /// Whether the task is past its due date and still open
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.column != Column::Done && self.due_date().is_some_and(|due| due < today)
    }
}

/// Caller-supplied payload for a new task (everything but id and timestamps)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub assignee: String,
    pub priority: Priority,
    pub due: String,
    pub column: Column,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            assignee: String::new(),
            priority: Priority::Normal,
            due: String::new(),
            column: Column::Backlog,
        }
    }

    /// Fill in a fresh id and creation timestamps
    pub fn into_task(self) -> Task {
        let now = now_ms();
        Task {
            id: new_task_id(),
            title: self.title,
            description: self.description,
            assignee: self.assignee,
            priority: self.priority,
            due: self.due,
            column: self.column,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for an existing task; `None` leaves the field alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<Priority>,
    pub due: Option<String>,
    pub column: Option<Column>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    pub(crate) fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(assignee) = self.assignee {
            task.assignee = assignee;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due) = self.due {
            task.due = due;
        }
        if let Some(column) = self.column {
            task.column = column;
        }
    }
}

/// The complete board state: the ordered task sequence plus active filters
///
/// Sequence order doubles as the per-column order: of two tasks in the same
/// column, the one earlier in `tasks` is shown first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub tasks: Vec<Task>,
    pub filters: Filters,
}

impl Document {
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// All tasks in a column, in sequence order, ignoring filters
    pub fn tasks_in(&self, column: Column) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.column == column)
    }

    /// Tasks in a column that pass the active filters, in sequence order
    pub fn visible_in(&self, column: Column) -> impl Iterator<Item = &Task> {
        self.tasks_in(column).filter(|t| self.filters.matches(t))
    }
}

/// Display theme, persisted separately from the document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Theme {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        [Theme::Light, Theme::Dark]
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| eyre!("Unknown theme: {} (expected light or dark)", s))
    }
}

/// Generate a fresh, time-ordered task id
pub fn new_task_id() -> String {
    format!("t-{}", uuid::Uuid::now_v7().simple())
}

/// Helper function to get current timestamp in milliseconds
pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, column: Column) -> Task {
        Task {
            id: id.to_string(),
            title: format!("Task {}", id),
            description: String::new(),
            assignee: String::new(),
            priority: Priority::Normal,
            due: String::new(),
            column,
            created_at: 1000,
            updated_at: 1000,
        }
    }

    #[test]
    fn test_now_ms() {
        let ts = now_ms();
        // Should be reasonable timestamp (after year 2020)
        assert!(ts > 1_600_000_000_000);
    }

    #[test]
    fn test_column_serialization() {
        assert_eq!(serde_json::to_string(&Column::InProgress).unwrap(), "\"inprogress\"");
        assert_eq!(serde_json::to_string(&Column::Backlog).unwrap(), "\"backlog\"");

        let column: Column = serde_json::from_str("\"todo\"").unwrap();
        assert_eq!(column, Column::Todo);
    }

    #[test]
    fn test_column_from_str() {
        assert_eq!("InProgress".parse::<Column>().unwrap(), Column::InProgress);
        assert_eq!(" done ".parse::<Column>().unwrap(), Column::Done);
        assert!("doing".parse::<Column>().is_err());
    }

    #[test]
    fn test_priority_from_str() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_task_uses_camel_case_fields() {
        let json = serde_json::to_value(task("a", Column::Todo)).unwrap();
        assert_eq!(json["createdAt"], 1000);
        assert_eq!(json["updatedAt"], 1000);
        assert_eq!(json["column"], "todo");
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn test_new_task_fills_id_and_timestamps() {
        let a = NewTask::new("Write docs").into_task();
        let b = NewTask::new("Write docs").into_task();

        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("t-"));
        assert_eq!(a.created_at, a.updated_at);
        assert_eq!(a.column, Column::Backlog);
        assert_eq!(a.priority, Priority::Normal);
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let mut t = task("a", Column::Todo);
        let patch = TaskPatch {
            title: Some("Renamed".to_string()),
            priority: Some(Priority::High),
            ..Default::default()
        };
        patch.apply(&mut t);

        assert_eq!(t.title, "Renamed");
        assert_eq!(t.priority, Priority::High);
        assert_eq!(t.column, Column::Todo);
        assert!(TaskPatch::default().is_empty());
    }

    #[test]
    fn test_is_overdue() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let mut t = task("a", Column::Todo);

        assert!(!t.is_overdue(today));

        t.due = "2024-05-09".to_string();
        assert!(t.is_overdue(today));

        t.due = "2024-05-10".to_string();
        assert!(!t.is_overdue(today));

        t.due = "not a date".to_string();
        assert!(!t.is_overdue(today));

        t.due = "2024-01-01".to_string();
        t.column = Column::Done;
        assert!(!t.is_overdue(today));
    }

    #[test]
    fn test_tasks_in_keeps_sequence_order() {
        let doc = Document {
            tasks: vec![
                task("a", Column::Todo),
                task("b", Column::Done),
                task("c", Column::Todo),
            ],
            filters: Filters::default(),
        };

        let ids: Vec<&str> = doc.tasks_in(Column::Todo).map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(doc.position("b"), Some(1));
        assert!(doc.get("zzz").is_none());
    }

    #[test]
    fn test_theme_toggle_and_parse() {
        assert_eq!(Theme::default(), Theme::Light);
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!("dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert_eq!(" Dark ".parse::<Theme>().unwrap(), Theme::Dark);
        assert_eq!("LIGHT".parse::<Theme>().unwrap(), Theme::Light);
        assert!("blue".parse::<Theme>().is_err());
    }
}
