use log::{debug, info};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use validator::Validate;

use crate::auth::IdentityContext;
use crate::clock::Clock;
use crate::error::AppError;
use crate::models::{NewTask, Task, TaskPatch};
use crate::reminder::{ReminderPipeline, ReminderReport};
use crate::store::{TaskStore, UserStore};

/// What `update_task` does when the task does not exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateMode {
    /// Create it under the requested id, matching the store's upsert semantics.
    #[default]
    Upsert,
    /// Fail with `NotFound`.
    Strict,
}

impl FromStr for UpdateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "upsert" => Ok(UpdateMode::Upsert),
            "strict" => Ok(UpdateMode::Strict),
            other => Err(format!("unknown update mode `{}`", other)),
        }
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            UpdateMode::Upsert => "upsert",
            UpdateMode::Strict => "strict",
        })
    }
}

/// The operation surface behind the gateway.
///
/// Every call takes the caller's identity explicitly. Users may only touch
/// their own tasks; admins may touch anyone's. When no owner is named, a
/// task id is first resolved through the flat index so that acting on
/// someone else's task is reported as `Unauthorized`, not `NotFound`.
pub struct TaskService {
    tasks: Arc<TaskStore>,
    profiles: Arc<UserStore>,
    reminders: Arc<ReminderPipeline>,
    clock: Arc<dyn Clock>,
    update_mode: UpdateMode,
}

impl TaskService {
    pub fn new(
        tasks: Arc<TaskStore>,
        profiles: Arc<UserStore>,
        reminders: Arc<ReminderPipeline>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tasks,
            profiles,
            reminders,
            clock,
            update_mode: UpdateMode::default(),
        }
    }

    pub fn with_update_mode(mut self, mode: UpdateMode) -> Self {
        self.update_mode = mode;
        self
    }

    fn check_due(&self, due_at: chrono::DateTime<chrono::Utc>) -> Result<(), AppError> {
        if due_at < self.clock.now() {
            return Err(AppError::InvalidArgument(
                "invalid time provided, task can not be set in the past".into(),
            ));
        }
        Ok(())
    }

    /// Email reminders for `owner_id` go to. Own tasks use the caller's email;
    /// an admin acting for someone else needs that user's profile.
    async fn owner_email(&self, identity: &IdentityContext, owner_id: &str) -> Result<String, AppError> {
        if owner_id == identity.subject_id {
            return Ok(identity.email.clone());
        }
        match self.profiles.find(owner_id).await? {
            Some(profile) => Ok(profile.email),
            None => Err(AppError::InvalidArgument(format!(
                "no profile for owner {}; cannot address reminders",
                owner_id
            ))),
        }
    }

    /// Picks the owner collection for a task id and checks the caller may use it.
    ///
    /// The flat index is authoritative for ownership: once a task id is
    /// indexed under one owner, naming another owner never reaches the store,
    /// since writing there would replace the index entry.
    async fn resolve_owner(
        &self,
        identity: &IdentityContext,
        owner: Option<&str>,
        task_id: &str,
    ) -> Result<String, AppError> {
        if task_id.trim().is_empty() {
            return Err(AppError::InvalidArgument("task id must not be empty".into()));
        }
        if let Some(requested) = owner {
            identity.authorize_owner(requested)?;
        }
        let indexed_owner = self.tasks.find_indexed(task_id).await?.map(|t| t.owner_id);

        let owner_id = match (owner, indexed_owner) {
            (Some(requested), Some(actual)) if requested != actual => {
                identity.authorize_owner(&actual)?;
                return Err(AppError::InvalidArgument(format!(
                    "task {} belongs to {}, not {}",
                    task_id, actual, requested
                )));
            }
            (_, Some(actual)) => actual,
            (Some(requested), None) => requested.to_string(),
            (None, None) => identity.subject_id.clone(),
        };
        identity.authorize_owner(&owner_id)?;
        Ok(owner_id)
    }

    pub async fn create_task(
        &self,
        identity: &IdentityContext,
        owner: Option<&str>,
        input: NewTask,
    ) -> Result<Task, AppError> {
        let owner_id = owner.unwrap_or(&identity.subject_id);
        identity.authorize_owner(owner_id)?;
        input.validate()?;
        self.check_due(input.due_at)?;

        let email = self.owner_email(identity, owner_id).await?;
        let task = self.tasks.create(owner_id, &email, input).await?;
        info!("{} created task {} for {}", identity.subject_id, task.task_id, owner_id);
        Ok(task)
    }

    pub async fn get_task(
        &self,
        identity: &IdentityContext,
        owner: Option<&str>,
        task_id: &str,
    ) -> Result<Task, AppError> {
        let owner_id = self.resolve_owner(identity, owner, task_id).await?;
        self.tasks.get(&owner_id, task_id).await
    }

    /// Replaces name, description and due time. Everything else is kept.
    pub async fn update_task(
        &self,
        identity: &IdentityContext,
        owner: Option<&str>,
        task_id: &str,
        patch: TaskPatch,
    ) -> Result<Task, AppError> {
        let owner_id = self.resolve_owner(identity, owner, task_id).await?;
        patch.validate()?;
        self.check_due(patch.due_at)?;

        let replacement = match self.tasks.find(&owner_id, task_id).await? {
            Some(existing) => {
                let mut task = existing.apply(patch);
                // The sent flag is only ever raised on the index copy.
                if let Some(indexed) = self.tasks.find_indexed(task_id).await? {
                    task.reminder_sent = indexed.reminder_sent;
                }
                task
            }
            None if self.update_mode == UpdateMode::Upsert => {
                debug!("task {} absent for {}; update creates it", task_id, owner_id);
                let email = self.owner_email(identity, &owner_id).await?;
                Task::new(patch.into(), &owner_id, &email, self.clock.now())
            }
            None => return Err(AppError::NotFound(format!("task {} not found", task_id))),
        };
        self.tasks.update(&owner_id, task_id, replacement).await
    }

    /// Deleting a task that is already gone succeeds.
    pub async fn delete_task(
        &self,
        identity: &IdentityContext,
        owner: Option<&str>,
        task_id: &str,
    ) -> Result<(), AppError> {
        let owner_id = self.resolve_owner(identity, owner, task_id).await?;
        self.tasks.delete(&owner_id, task_id).await?;
        info!("{} deleted task {} of {}", identity.subject_id, task_id, owner_id);
        Ok(())
    }

    pub async fn list_recent(
        &self,
        identity: &IdentityContext,
        owner: Option<&str>,
        n: usize,
    ) -> Result<Vec<Task>, AppError> {
        let owner_id = owner.unwrap_or(&identity.subject_id);
        identity.authorize_owner(owner_id)?;
        if n == 0 {
            return Err(AppError::InvalidArgument("n must be at least 1".into()));
        }
        self.tasks.list_recent(owner_id, n).await
    }

    pub async fn list_expired(
        &self,
        identity: &IdentityContext,
        owner: Option<&str>,
    ) -> Result<Vec<Task>, AppError> {
        let owner_id = owner.unwrap_or(&identity.subject_id);
        identity.authorize_owner(owner_id)?;
        self.tasks.list_expired(owner_id).await
    }

    /// Runs the reminder pipeline once. Admin only.
    pub async fn trigger_reminders(
        &self,
        identity: &IdentityContext,
    ) -> Result<ReminderReport, AppError> {
        identity.require_admin()?;
        self.reminders.run().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::clock::ManualClock;
    use crate::models::UserProfile;
    use crate::reminder::RecordingNotifier;
    use crate::store::MemoryStore;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    struct Fixture {
        service: TaskService,
        tasks: Arc<TaskStore>,
        profiles: Arc<UserStore>,
        notifier: Arc<RecordingNotifier>,
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn fixture(mode: UpdateMode) -> Fixture {
        let clock = Arc::new(ManualClock::new(start()));
        let docs = Arc::new(MemoryStore::new());
        let tasks = Arc::new(TaskStore::new(docs.clone(), clock.clone()));
        let profiles = Arc::new(UserStore::new(docs));
        let notifier = Arc::new(RecordingNotifier::new());
        let pipeline = Arc::new(ReminderPipeline::new(tasks.clone(), notifier.clone()));
        let service = TaskService::new(tasks.clone(), profiles.clone(), pipeline, clock)
            .with_update_mode(mode);
        Fixture {
            service,
            tasks,
            profiles,
            notifier,
        }
    }

    fn alice() -> IdentityContext {
        IdentityContext::new("u1", "a@x.com", Role::User)
    }

    fn bob() -> IdentityContext {
        IdentityContext::new("u2", "b@x.com", Role::User)
    }

    fn admin() -> IdentityContext {
        IdentityContext::new("root", "root@x.com", Role::Admin)
    }

    fn new_task(name: &str, due_in: Duration) -> NewTask {
        NewTask {
            name: name.to_string(),
            description: String::new(),
            due_at: start() + due_in,
        }
    }

    fn patch(name: &str) -> TaskPatch {
        TaskPatch {
            name: name.to_string(),
            description: "patched".to_string(),
            due_at: start() + Duration::hours(3),
        }
    }

    #[actix_rt::test]
    async fn test_create_uses_caller_as_owner() {
        let f = fixture(UpdateMode::Upsert);
        let task = f
            .service
            .create_task(&alice(), None, new_task("t1", Duration::hours(1)))
            .await
            .unwrap();
        assert_eq!(task.owner_id, "u1");
        assert_eq!(task.owner_email, "a@x.com");
    }

    #[actix_rt::test]
    async fn test_create_rejects_past_due_and_long_names() {
        let f = fixture(UpdateMode::Upsert);
        assert!(matches!(
            f.service
                .create_task(&alice(), None, new_task("late", Duration::seconds(-1)))
                .await,
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            f.service
                .create_task(&alice(), None, new_task(&"n".repeat(51), Duration::hours(1)))
                .await,
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[actix_rt::test]
    async fn test_user_cannot_touch_another_owners_task() {
        let f = fixture(UpdateMode::Upsert);
        let task = f
            .service
            .create_task(&alice(), None, new_task("t1", Duration::hours(1)))
            .await
            .unwrap();
        let id = task.task_id.as_str();

        for owner in [None, Some("u1")] {
            assert!(matches!(
                f.service.get_task(&bob(), owner, id).await,
                Err(AppError::Unauthorized(_))
            ));
            assert!(matches!(
                f.service.update_task(&bob(), owner, id, patch("hijack")).await,
                Err(AppError::Unauthorized(_))
            ));
            assert!(matches!(
                f.service.delete_task(&bob(), owner, id).await,
                Err(AppError::Unauthorized(_))
            ));
        }
        assert!(matches!(
            f.service.create_task(&bob(), Some("u1"), new_task("x", Duration::hours(1))).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            f.service.list_recent(&bob(), Some("u1"), 5).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            f.service.list_expired(&bob(), Some("u1")).await,
            Err(AppError::Unauthorized(_))
        ));

        // Untouched.
        assert_eq!(f.service.get_task(&alice(), None, id).await.unwrap(), task);
    }

    #[actix_rt::test]
    async fn test_naming_self_as_owner_does_not_reach_foreign_task() {
        for mode in [UpdateMode::Upsert, UpdateMode::Strict] {
            let f = fixture(mode);
            let task = f
                .service
                .create_task(&alice(), None, new_task("t1", Duration::minutes(2)))
                .await
                .unwrap();
            let id = task.task_id.as_str();
            let indexed_before = f.tasks.find_indexed(id).await.unwrap();

            assert!(matches!(
                f.service.get_task(&bob(), Some("u2"), id).await,
                Err(AppError::Unauthorized(_))
            ));
            assert!(matches!(
                f.service.update_task(&bob(), Some("u2"), id, patch("hijack")).await,
                Err(AppError::Unauthorized(_))
            ));
            assert!(matches!(
                f.service.delete_task(&bob(), Some("u2"), id).await,
                Err(AppError::Unauthorized(_))
            ));

            // No second copy under bob, and the index still points at alice.
            assert_eq!(f.tasks.find("u2", id).await.unwrap(), None);
            assert_eq!(f.tasks.find_indexed(id).await.unwrap(), indexed_before);
            assert_eq!(f.service.get_task(&alice(), None, id).await.unwrap(), task);

            f.service.trigger_reminders(&admin()).await.unwrap();
            assert_eq!(
                f.notifier.sent(),
                vec![("a@x.com".to_string(), "Your task is expiring soon: t1".to_string())],
                "mode {}",
                mode
            );
        }
    }

    #[actix_rt::test]
    async fn test_admin_cannot_move_task_to_another_owner() {
        let f = fixture(UpdateMode::Upsert);
        let task = f
            .service
            .create_task(&alice(), None, new_task("t1", Duration::hours(1)))
            .await
            .unwrap();
        let id = task.task_id.as_str();

        assert!(matches!(
            f.service.update_task(&admin(), Some("u2"), id, patch("moved")).await,
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            f.service.delete_task(&admin(), Some("u2"), id).await,
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            f.service.get_task(&admin(), Some("u2"), id).await,
            Err(AppError::InvalidArgument(_))
        ));

        assert_eq!(f.tasks.find("u2", id).await.unwrap(), None);
        assert_eq!(f.tasks.find_indexed(id).await.unwrap(), Some(task.clone()));

        // Naming the real owner works.
        let fetched = f.service.get_task(&admin(), Some("u1"), id).await.unwrap();
        assert_eq!(fetched, task);
    }

    #[actix_rt::test]
    async fn test_admin_acts_on_any_owner() {
        let f = fixture(UpdateMode::Upsert);
        let task = f
            .service
            .create_task(&alice(), None, new_task("t1", Duration::hours(1)))
            .await
            .unwrap();

        let fetched = f
            .service
            .get_task(&admin(), None, &task.task_id)
            .await
            .unwrap();
        assert_eq!(fetched, task);

        let updated = f
            .service
            .update_task(&admin(), None, &task.task_id, patch("by admin"))
            .await
            .unwrap();
        assert_eq!(updated.owner_id, "u1");
        assert_eq!(updated.owner_email, "a@x.com");
        assert_eq!(updated.name, "by admin");

        f.service
            .delete_task(&admin(), None, &task.task_id)
            .await
            .unwrap();
        assert!(matches!(
            f.service.get_task(&alice(), None, &task.task_id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[actix_rt::test]
    async fn test_admin_creating_for_others_needs_profile() {
        let f = fixture(UpdateMode::Upsert);
        assert!(matches!(
            f.service
                .create_task(&admin(), Some("u2"), new_task("t", Duration::hours(1)))
                .await,
            Err(AppError::InvalidArgument(_))
        ));

        f.profiles
            .put(UserProfile {
                user_id: "u2".to_string(),
                email: "b@x.com".to_string(),
                first_name: String::new(),
                last_name: String::new(),
                phone: String::new(),
                address: String::new(),
            })
            .await
            .unwrap();
        let task = f
            .service
            .create_task(&admin(), Some("u2"), new_task("t", Duration::hours(1)))
            .await
            .unwrap();
        assert_eq!(task.owner_email, "b@x.com");
    }

    #[actix_rt::test]
    async fn test_update_keeps_reminder_flag_and_creation_time() {
        let f = fixture(UpdateMode::Upsert);
        let task = f
            .service
            .create_task(&alice(), None, new_task("t1", Duration::minutes(2)))
            .await
            .unwrap();
        f.service.trigger_reminders(&admin()).await.unwrap();

        let updated = f
            .service
            .update_task(&alice(), None, &task.task_id, patch("renamed"))
            .await
            .unwrap();
        assert_eq!(updated.created_at, task.created_at);
        assert_eq!(updated.description, "patched");
        let indexed = f.tasks.find_indexed(&task.task_id).await.unwrap().unwrap();
        assert!(indexed.reminder_sent);
        assert_eq!(indexed.name, "renamed");
    }

    #[actix_rt::test]
    async fn test_update_of_missing_task_upserts() {
        let f = fixture(UpdateMode::Upsert);
        let updated = f
            .service
            .update_task(&alice(), None, "t-new", patch("fresh"))
            .await
            .unwrap();
        assert_eq!(updated.task_id, "t-new");

        let fetched = f.service.get_task(&alice(), None, "t-new").await.unwrap();
        assert_eq!(fetched.name, "fresh");
        assert_eq!(fetched.description, "patched");
        assert_eq!(fetched.due_at, start() + Duration::hours(3));
        assert_eq!(fetched.owner_email, "a@x.com");
    }

    #[actix_rt::test]
    async fn test_strict_mode_rejects_missing_task() {
        let f = fixture(UpdateMode::Strict);
        assert!(matches!(
            f.service
                .update_task(&alice(), None, "t-new", patch("fresh"))
                .await,
            Err(AppError::NotFound(_))
        ));
    }

    #[actix_rt::test]
    async fn test_delete_is_idempotent() {
        let f = fixture(UpdateMode::Upsert);
        let task = f
            .service
            .create_task(&alice(), None, new_task("t1", Duration::hours(1)))
            .await
            .unwrap();
        f.service
            .delete_task(&alice(), None, &task.task_id)
            .await
            .unwrap();
        f.service
            .delete_task(&alice(), None, &task.task_id)
            .await
            .unwrap();
    }

    #[actix_rt::test]
    async fn test_empty_ids_and_zero_n_are_invalid() {
        let f = fixture(UpdateMode::Upsert);
        assert!(matches!(
            f.service.get_task(&alice(), None, "").await,
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            f.service.delete_task(&alice(), None, " ").await,
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            f.service.list_recent(&alice(), None, 0).await,
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[actix_rt::test]
    async fn test_trigger_reminders_is_admin_only() {
        let f = fixture(UpdateMode::Upsert);
        f.service
            .create_task(&alice(), None, new_task("t1", Duration::minutes(2)))
            .await
            .unwrap();

        assert!(matches!(
            f.service.trigger_reminders(&alice()).await,
            Err(AppError::Unauthorized(_))
        ));
        let report = f.service.trigger_reminders(&admin()).await.unwrap();
        assert_eq!(report.notified, 1);
        assert_eq!(f.notifier.sent()[0].0, "a@x.com");
    }
}
