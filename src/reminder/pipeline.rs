//! One reminder run: select, notify, mark.
//!
//! A run takes a snapshot of the reminder candidates, sends one notification
//! per task in snapshot order, and stages `reminderSent = true` on the flat
//! index for each task it notified. Staged writes are committed whenever the
//! batch reaches capacity and once more after the last task.
//!
//! Delivery is at most once per run. The first failed send aborts the run:
//! batches already committed stay committed, staged writes are dropped, and
//! nothing is retried. A task notified but not yet committed will be notified
//! again by the next run.

use log::{debug, error, info};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::notifier::{reminder_message, Notifier};
use crate::error::AppError;
use crate::store::{TaskStore, WriteBatch, MAX_BATCH_WRITES};

/// Outcome of a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReminderReport {
    pub notified: usize,
    pub commits: usize,
    /// Set when the run was skipped because another one was in flight.
    pub skipped: bool,
}

pub struct ReminderPipeline {
    tasks: Arc<TaskStore>,
    notifier: Arc<dyn Notifier>,
    batch_capacity: usize,
    single_flight: bool,
    running: AtomicBool,
}

/// Clears the in-flight flag when the run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ReminderPipeline {
    pub fn new(tasks: Arc<TaskStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            tasks,
            notifier,
            batch_capacity: MAX_BATCH_WRITES,
            single_flight: false,
            running: AtomicBool::new(false),
        }
    }

    /// Writes per commit, clamped to `1..=MAX_BATCH_WRITES`.
    pub fn with_batch_capacity(mut self, capacity: usize) -> Self {
        self.batch_capacity = capacity.clamp(1, MAX_BATCH_WRITES);
        self
    }

    /// When enabled, a run that starts while another is in flight returns a
    /// skipped report instead of notifying a second time.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    fn try_enter(&self) -> Option<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(&self.running))
    }

    pub async fn run(&self) -> Result<ReminderReport, AppError> {
        let _guard = if self.single_flight {
            match self.try_enter() {
                Some(guard) => Some(guard),
                None => {
                    info!("reminder run already in flight; skipping");
                    return Ok(ReminderReport {
                        skipped: true,
                        ..ReminderReport::default()
                    });
                }
            }
        } else {
            None
        };

        let candidates = self.tasks.list_reminder_candidates().await?;
        if candidates.is_empty() {
            debug!("no expiring tasks");
            return Ok(ReminderReport::default());
        }

        let mut report = ReminderReport::default();
        let mut batch = WriteBatch::new();

        for (email, tasks) in &candidates {
            for task in tasks {
                let message = reminder_message(task);
                if let Err(e) = self.notifier.send(email, &message).await {
                    error!(
                        "reminder to {} for task {} failed; aborting run after {} sent: {}",
                        email, task.task_id, report.notified, e
                    );
                    return Err(e.into());
                }
                info!("reminder sent to {} for task {}", email, task.name);
                report.notified += 1;

                self.tasks.stage_reminder_sent(&mut batch, &task.task_id);
                if batch.len() >= self.batch_capacity {
                    self.flush(&mut batch, &mut report).await?;
                }
            }
        }
        if !batch.is_empty() {
            self.flush(&mut batch, &mut report).await?;
        }

        info!(
            "reminder run finished: {} sent, {} commits",
            report.notified, report.commits
        );
        Ok(report)
    }

    async fn flush(
        &self,
        batch: &mut WriteBatch,
        report: &mut ReminderReport,
    ) -> Result<(), AppError> {
        let staged = std::mem::take(batch);
        let size = staged.len();
        if let Err(e) = self.tasks.commit(staged).await {
            error!("committing {} reminder flags failed: {}", size, e);
            return Err(e);
        }
        report.commits += 1;
        debug!("committed {} reminder flags", size);
        Ok(())
    }
}
