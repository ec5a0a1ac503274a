//! Task persistence over two collections.
//!
//! Every task lives twice: under its owner (`users/{ownerId}/tasks/{taskId}`)
//! and in the flat index (`task_list/{taskId}`), which exists so queries can span
//! all owners. Writes go to the owner copy first and the index second, with no
//! transaction across the two. A failure between the writes leaves the copies
//! diverged until the next successful write to the same task.
//!
//! The index copy is also the only one whose `reminderSent` flag is kept
//! current: the reminder pipeline raises it there alone, and the owner copy
//! only picks it up on the task's next update.

use chrono::{Duration, DateTime, SubsecRound, Utc};
use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::{json, Map};
use std::sync::Arc;
use uuid::Uuid;

use super::document::{
    from_document, to_document, DocPath, DocumentStore, Direction, Filter, Query, WriteBatch,
};
use crate::clock::Clock;
use crate::error::AppError;
use crate::models::task::{fields, NewTask, Task};

pub const OWNERS_COLLECTION: &str = "users";
pub const TASKS_SUBCOLLECTION: &str = "tasks";
pub const TASK_INDEX_COLLECTION: &str = "task_list";

/// How far ahead of `now` a due time must fall to be reminded about.
pub const REMINDER_WINDOW_MINUTES: i64 = 5;

/// Tasks awaiting a reminder, grouped by recipient in query order.
pub type ReminderCandidates = IndexMap<String, Vec<Task>>;

pub struct TaskStore {
    docs: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    reminder_window: Duration,
}

fn owner_collection(owner_id: &str) -> String {
    format!("{}/{}/{}", OWNERS_COLLECTION, owner_id, TASKS_SUBCOLLECTION)
}

fn owner_path(owner_id: &str, task_id: &str) -> DocPath {
    DocPath::new(owner_collection(owner_id), task_id)
}

fn index_path(task_id: &str) -> DocPath {
    DocPath::new(TASK_INDEX_COLLECTION, task_id)
}

fn require(value: &str, what: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidArgument(format!("{} must not be empty", what)));
    }
    Ok(())
}

fn millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

impl TaskStore {
    pub fn new(docs: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            docs,
            clock,
            reminder_window: Duration::minutes(REMINDER_WINDOW_MINUTES),
        }
    }

    pub fn with_reminder_window(mut self, window: Duration) -> Self {
        self.reminder_window = window;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Writes both copies of `task` as given.
    async fn write_both(&self, task: &Task) -> Result<(), AppError> {
        let doc = to_document(task)?;
        self.docs
            .set(&owner_path(&task.owner_id, &task.task_id), doc.clone())
            .await?;
        if let Err(e) = self.docs.set(&index_path(&task.task_id), doc).await {
            warn!(
                "task {} written for owner {} but the flat index write failed; copies diverged: {}",
                task.task_id, task.owner_id, e
            );
            return Err(e.into());
        }
        Ok(())
    }

    /// Assigns a fresh task id and creation time, then writes both copies.
    pub async fn create(
        &self,
        owner_id: &str,
        owner_email: &str,
        input: NewTask,
    ) -> Result<Task, AppError> {
        require(owner_id, "owner id")?;
        let mut task = Task::new(input, owner_id, owner_email, self.now());
        task.task_id = Uuid::new_v4().to_string();
        task.due_at = task.due_at.trunc_subsecs(3);

        self.write_both(&task).await?;
        debug!("created task {} for owner {}", task.task_id, owner_id);
        Ok(task)
    }

    /// Reads the owner copy, `None` when absent.
    pub async fn find(&self, owner_id: &str, task_id: &str) -> Result<Option<Task>, AppError> {
        require(owner_id, "owner id")?;
        require(task_id, "task id")?;
        match self.docs.get(&owner_path(owner_id, task_id)).await? {
            Some(doc) => Ok(Some(from_document(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn get(&self, owner_id: &str, task_id: &str) -> Result<Task, AppError> {
        self.find(owner_id, task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("task {} not found", task_id)))
    }

    /// Reads the flat index copy, which is keyed by task id alone.
    pub async fn find_indexed(&self, task_id: &str) -> Result<Option<Task>, AppError> {
        require(task_id, "task id")?;
        match self.docs.get(&index_path(task_id)).await? {
            Some(doc) => Ok(Some(from_document(doc)?)),
            None => Ok(None),
        }
    }

    /// Full replace of both copies. A task that does not exist yet is created
    /// under the given id.
    pub async fn update(
        &self,
        owner_id: &str,
        task_id: &str,
        mut task: Task,
    ) -> Result<Task, AppError> {
        require(owner_id, "owner id")?;
        require(task_id, "task id")?;
        task.task_id = task_id.to_string();
        task.owner_id = owner_id.to_string();
        task.due_at = task.due_at.trunc_subsecs(3);
        task.updated_at = self.now();

        self.write_both(&task).await?;
        Ok(task)
    }

    /// Removes both copies. Deleting an absent task succeeds.
    pub async fn delete(&self, owner_id: &str, task_id: &str) -> Result<(), AppError> {
        require(owner_id, "owner id")?;
        require(task_id, "task id")?;
        self.docs.delete(&owner_path(owner_id, task_id)).await?;
        if let Err(e) = self.docs.delete(&index_path(task_id)).await {
            warn!(
                "task {} removed for owner {} but is still in the flat index: {}",
                task_id, owner_id, e
            );
            return Err(e.into());
        }
        Ok(())
    }

    /// Newest first, at most `n`.
    pub async fn list_recent(&self, owner_id: &str, n: usize) -> Result<Vec<Task>, AppError> {
        require(owner_id, "owner id")?;
        let query = Query::new()
            .order_by(fields::CREATED_AT, Direction::Desc)
            .limit(n);
        self.load(&owner_collection(owner_id), &query).await
    }

    /// Every task of the owner whose due time has passed.
    pub async fn list_expired(&self, owner_id: &str) -> Result<Vec<Task>, AppError> {
        require(owner_id, "owner id")?;
        let query = Query::new().filter(Filter::le(fields::DUE_AT, millis(self.now())));
        self.load(&owner_collection(owner_id), &query).await
    }

    /// Scans the flat index for unsent tasks with `now < dueAt <= now + window`,
    /// across all owners, grouped by owner email.
    pub async fn list_reminder_candidates(&self) -> Result<ReminderCandidates, AppError> {
        let now = self.now();
        let query = Query::new()
            .filter(Filter::eq(fields::REMINDER_SENT, false))
            .filter(Filter::gt(fields::DUE_AT, millis(now)))
            .filter(Filter::le(fields::DUE_AT, millis(now + self.reminder_window)));

        let mut grouped = ReminderCandidates::new();
        for task in self.load(TASK_INDEX_COLLECTION, &query).await? {
            grouped
                .entry(task.owner_email.clone())
                .or_default()
                .push(task);
        }
        Ok(grouped)
    }

    /// Stages `reminderSent = true` on the flat index copy of `task_id`.
    pub fn stage_reminder_sent(&self, batch: &mut WriteBatch, task_id: &str) {
        let mut update = Map::new();
        update.insert(fields::REMINDER_SENT.to_string(), json!(true));
        batch.merge(index_path(task_id), update);
    }

    pub async fn commit(&self, batch: WriteBatch) -> Result<(), AppError> {
        Ok(self.docs.commit(batch).await?)
    }

    async fn load(&self, collection: &str, query: &Query) -> Result<Vec<Task>, AppError> {
        let docs = self.docs.query(collection, query).await?;
        let mut tasks = Vec::with_capacity(docs.len());
        for doc in docs {
            tasks.push(from_document(doc)?);
        }
        Ok(tasks)
    }
}
