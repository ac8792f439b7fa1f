// File: ./src/model/item.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};
use uuid::Uuid;

/// Time-blocks carry no duration in the text; this is the display/scheduling default.
pub const DEFAULT_BLOCK_DURATION_MINS: u32 = 60;

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// One checkbox line (`* [ ]` / `- [x]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Assigned at parse time, not stable across re-parses.
    pub id: String,
    pub content: String,
    pub completed: bool,
    /// 1-based line in the source text; the join key used by the mutator.
    pub line_number: usize,
    /// `YYYY-MM-DD` of the document that contained the line.
    pub created_date: String,
    pub scheduled_time: Option<String>,
    pub indent_level: usize,
    pub parent_id: Option<String>,
}

impl Task {
    /// Incomplete with non-empty content: the tasks the migration scanner cares about.
    pub fn is_outstanding(&self) -> bool {
        !self.completed && !self.content.trim().is_empty()
    }
}

/// One `+ [ ]` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBlock {
    pub id: String,
    pub content: String,
    pub completed: bool,
    pub start_time: Option<String>,
    /// Minutes.
    pub duration: u32,
    pub line_number: usize,
}

/// Tasks and time-blocks of one raw-text blob, in line order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub date: NaiveDate,
    pub tasks: Vec<Task>,
    pub time_blocks: Vec<TimeBlock>,
}

impl ParsedDocument {
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_at_line(&self, line_number: usize) -> Option<&Task> {
        self.tasks.iter().find(|t| t.line_number == line_number)
    }

    pub fn children_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks
            .iter()
            .filter(move |t| t.parent_id.as_deref() == Some(id))
    }

    pub fn incomplete_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.is_outstanding())
    }

    pub fn has_outstanding_tasks(&self) -> bool {
        self.tasks.iter().any(Task::is_outstanding)
    }

    pub fn has_tasks(&self) -> bool {
        self.tasks.iter().any(|t| !t.content.trim().is_empty())
    }

    pub fn has_time_blocks(&self) -> bool {
        self.time_blocks.iter().any(|b| !b.content.trim().is_empty())
    }

    /// Tasks grouped by their scheduled `HH:MM`, ordered by time string.
    pub fn scheduled_tasks(&self) -> BTreeMap<&str, Vec<&Task>> {
        let mut map: BTreeMap<&str, Vec<&Task>> = BTreeMap::new();
        for task in &self.tasks {
            if let Some(time) = task.scheduled_time.as_deref() {
                map.entry(time).or_default().push(task);
            }
        }
        map
    }

    pub fn tasks_at<'a>(&'a self, time: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks
            .iter()
            .filter(move |t| t.scheduled_time.as_deref() == Some(time))
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Decision {
    Move,
    Dismiss,
}

/// A task projected for one review session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationTask {
    pub id: String,
    pub content: String,
    pub original_date: String,
    pub line_number: usize,
    pub indent_level: usize,
}

impl From<&Task> for MigrationTask {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            content: task.content.clone(),
            original_date: task.created_date.clone(),
            line_number: task.line_number,
            indent_level: task.indent_level,
        }
    }
}

/// One immutable ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationHistoryEntry {
    pub task_content: String,
    pub original_date: String,
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl MigrationHistoryEntry {
    pub fn new(task: &MigrationTask, decision: Decision, target_date: Option<String>) -> Self {
        Self {
            task_content: task.content.clone(),
            original_date: task.original_date.clone(),
            decision,
            target_date,
            timestamp: Utc::now(),
        }
    }

    /// Did this entry move `content` from `original_date` into `target_date`?
    pub fn is_move_of(&self, content: &str, original_date: &str, target_date: &str) -> bool {
        self.decision == Decision::Move
            && self.task_content == content
            && self.original_date == original_date
            && self.target_date.as_deref() == Some(target_date)
    }
}
