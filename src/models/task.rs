use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Field names as they appear in stored documents.
pub mod fields {
    pub const CREATED_AT: &str = "createdAt";
    pub const DUE_AT: &str = "dueAt";
    pub const REMINDER_SENT: &str = "reminderSent";
}

/// Input structure for creating a task.
/// Contains validation rules for its fields.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    /// Must be between 1 and 50 characters.
    #[validate(length(min = 1, max = 50))]
    pub name: String,

    /// At most 300 characters.
    #[validate(length(max = 300))]
    #[serde(default)]
    pub description: String,

    /// When the task expires. Must not be in the past at creation.
    #[serde(with = "ts_milliseconds")]
    pub due_at: DateTime<Utc>,
}

/// Replacement values for the mutable fields of a task.
///
/// Owner, owner email, creation time and the reminder flag are not part of
/// the patch and survive an update untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[validate(length(min = 1, max = 50))]
    pub name: String,

    #[validate(length(max = 300))]
    #[serde(default)]
    pub description: String,

    #[serde(with = "ts_milliseconds")]
    pub due_at: DateTime<Utc>,
}

/// Represents a task as stored (both copies) and returned by the API.
/// Timestamps travel as unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Globally unique identifier (UUID v4).
    pub task_id: String,
    pub owner_id: String,
    /// Where reminders for this task are sent.
    pub owner_email: String,
    pub name: String,
    pub description: String,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    pub due_at: DateTime<Utc>,
    /// Set only by the reminder pipeline, and only on the flat index copy.
    /// The owner copy, which `GET /api/tasks/{id}` returns, may still read
    /// `false` after a reminder went out; it catches up on the next update.
    #[serde(default)]
    pub reminder_sent: bool,
}

impl Task {
    /// Builds a task from creation input. `task_id` is left for the store to assign.
    pub fn new(input: NewTask, owner_id: &str, owner_email: &str, now: DateTime<Utc>) -> Self {
        Self {
            task_id: String::new(),
            owner_id: owner_id.to_string(),
            owner_email: owner_email.to_string(),
            name: input.name,
            description: input.description,
            created_at: now,
            updated_at: now,
            due_at: input.due_at,
            reminder_sent: false,
        }
    }

    /// Replaces the mutable fields with the patch values.
    pub fn apply(mut self, patch: TaskPatch) -> Self {
        self.name = patch.name;
        self.description = patch.description;
        self.due_at = patch.due_at;
        self
    }
}

impl From<TaskPatch> for NewTask {
    fn from(patch: TaskPatch) -> Self {
        Self {
            name: patch.name,
            description: patch.description,
            due_at: patch.due_at,
        }
    }
}
