//! Task model definitions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Maximum title length, in characters
pub const TITLE_MAX_CHARS: usize = 100;

/// Maximum description length, in characters
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Task status, one per board column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "To Do")]
    ToDo,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Done")]
    Done,
}

impl TaskStatus {
    /// Every status, in board column order
    pub const ALL: [TaskStatus; 3] = [Self::ToDo, Self::InProgress, Self::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToDo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::ToDo
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                Error::validation(
                    "status",
                    format!("expected one of 'To Do', 'In Progress', 'Done', got '{}'", s),
                )
            })
    }
}

fn validate_title(title: &str) -> Result<()> {
    let len = title.chars().count();
    if len == 0 {
        return Err(Error::validation("title", "must not be empty"));
    }
    if len > TITLE_MAX_CHARS {
        return Err(Error::validation(
            "title",
            format!("must be at most {} characters, got {}", TITLE_MAX_CHARS, len),
        ));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<()> {
    let len = description.map_or(0, |d| d.chars().count());
    if len > DESCRIPTION_MAX_CHARS {
        return Err(Error::validation(
            "description",
            format!(
                "must be at most {} characters, got {}",
                DESCRIPTION_MAX_CHARS, len
            ),
        ));
    }
    Ok(())
}

fn validate_order(order: f64) -> Result<()> {
    if !order.is_finite() {
        return Err(Error::validation("order", "must be a finite number"));
    }
    Ok(())
}

/// A task on the board
///
/// Fields are private so that every `Task` in existence satisfies the length
/// and order rules; it (de)serializes through [`TaskRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TaskRecord", into = "TaskRecord")]
pub struct Task {
    id: Uuid,
    title: String,
    description: Option<String>,
    status: TaskStatus,
    order: f64,
}

impl Task {
    /// Create a new task with a fresh id
    pub fn new(
        title: impl Into<String>,
        description: Option<String>,
        status: TaskStatus,
        order: f64,
    ) -> Result<Self> {
        let title = title.into();
        validate_title(&title)?;
        validate_description(description.as_deref())?;
        validate_order(order)?;

        Ok(Self {
            id: Uuid::new_v4(),
            title,
            description,
            status,
            order,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn order(&self) -> f64 {
        self.order
    }
}

/// Plain record form of a task, as stored on disk and sent over the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub order: f64,
}

impl TryFrom<TaskRecord> for Task {
    type Error = Error;

    fn try_from(record: TaskRecord) -> Result<Self> {
        validate_title(&record.title)?;
        validate_description(record.description.as_deref())?;
        validate_order(record.order)?;

        Ok(Self {
            id: record.id,
            title: record.title,
            description: record.description,
            status: record.status,
            order: record.order,
        })
    }
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            order: task.order,
        }
    }
}

/// Input for creating a task; id and order are assigned by the repository
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: TaskStatus::default(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Build the task at the given column position
    pub fn into_task(self, order: f64) -> Result<Task> {
        Task::new(self.title, self.description, self.status, order)
    }
}

/// Distinguishes an explicit `null` from an absent field
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Partial update of a task's title and description
///
/// `description` is `None` when absent, `Some(None)` when explicitly null.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TaskUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
}

impl TaskUpdate {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    /// Validate every provided field, then apply them to `task`
    pub fn apply(self, task: &mut Task) -> Result<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(description) = &self.description {
            validate_description(description.as_deref())?;
        }

        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        Ok(())
    }
}

/// Move of a task to another column and/or position
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TaskMove {
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub order: Option<f64>,
}

impl TaskMove {
    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn order(mut self, order: f64) -> Self {
        self.order = Some(order);
        self
    }

    /// Validate the provided order, then apply the move to `task`
    pub fn apply(self, task: &mut Task) -> Result<()> {
        if let Some(order) = self.order {
            validate_order(order)?;
        }

        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(order) = self.order {
            task.order = order;
        }
        Ok(())
    }
}

/// Order for a task appended to the `status` column
pub fn next_order(tasks: &[Task], status: TaskStatus) -> f64 {
    tasks
        .iter()
        .filter(|t| t.status == status)
        .map(|t| t.order)
        .reduce(f64::max)
        .map_or(1.0, |max| max + 1.0)
}

/// A single board column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub id: TaskStatus,
    pub title: String,
    pub tasks: Vec<Task>,
}

/// The board as the UI renders it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub columns: Vec<Column>,
    pub column_order: Vec<TaskStatus>,
}

impl Board {
    /// Group tasks into columns sorted by `order`; ties keep collection order
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let columns = TaskStatus::ALL
            .into_iter()
            .map(|status| {
                let mut column: Vec<Task> = tasks
                    .iter()
                    .filter(|t| t.status == status)
                    .cloned()
                    .collect();
                column.sort_by(|a, b| a.order.total_cmp(&b.order));
                Column {
                    id: status,
                    title: status.to_string(),
                    tasks: column,
                }
            })
            .collect();

        Self {
            columns,
            column_order: TaskStatus::ALL.to_vec(),
        }
    }
}
