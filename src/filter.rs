// Board filters: free-text search, priority and assignee

use crate::models::{Priority, Task};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Active board filters
///
/// An empty field places no constraint on which tasks are shown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    /// Free-text query matched against title, description and assignee
    #[serde(default)]
    pub q: String,
    /// Exact priority; serialized as `""` when unset
    #[serde(default, with = "empty_as_none")]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub assignee: String,
}

impl Filters {
    /// True when no field constrains the view
    pub fn is_empty(&self) -> bool {
        self.q.trim().is_empty() && self.priority.is_none() && self.assignee.trim().is_empty()
    }

    /// Check a task against every active filter
    pub fn matches(&self, task: &Task) -> bool {
        let q = self.q.trim().to_lowercase();
        if !q.is_empty() {
            let hit = [&task.title, &task.description, &task.assignee]
                .iter()
                .any(|field| field.to_lowercase().contains(&q));
            if !hit {
                return false;
            }
        }

        if let Some(priority) = self.priority {
            if task.priority != priority {
                return false;
            }
        }

        let assignee = self.assignee.trim();
        if !assignee.is_empty() && !task.assignee.trim().eq_ignore_ascii_case(assignee) {
            return false;
        }

        true
    }

    /// Merge the fields present in `patch`, leaving the rest unchanged
    pub fn merge(&mut self, patch: FiltersPatch) {
        if let Some(q) = patch.q {
            self.q = q;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(assignee) = patch.assignee {
            self.assignee = assignee;
        }
    }
}

/// Partial filter update
///
/// `priority: Some(None)` clears the priority filter; `None` leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FiltersPatch {
    pub q: Option<String>,
    pub priority: Option<Option<Priority>>,
    pub assignee: Option<String>,
}

impl FiltersPatch {
    /// A patch that resets every field to "no constraint"
    pub fn clear() -> Self {
        Self {
            q: Some(String::new()),
            priority: Some(None),
            assignee: Some(String::new()),
        }
    }
}

mod empty_as_none {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<Priority>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.map(Priority::as_str).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Priority>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        raw.parse().map(Some).map_err(serde::de::Error::custom)
    }
}
