use async_trait::async_trait;
use log::info;
use std::fmt;
use std::sync::Mutex;

use crate::models::Task;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyError(pub String);

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "notification failed: {}", self.0)
    }
}

impl std::error::Error for NotifyError {}

/// Delivers one message to one recipient. The pipeline awaits each send
/// before moving on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), NotifyError>;
}

pub fn reminder_message(task: &Task) -> String {
    format!("Your task is expiring soon: {}", task.name)
}

/// Writes reminders to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), NotifyError> {
        info!("reminder for {}: {}", recipient, message);
        Ok(())
    }
}

/// Keeps every sent message in memory. Can be told to start failing after a
/// number of successful sends.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail_after: Mutex<Option<usize>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends after the first `successes` fail.
    pub fn fail_after(&self, successes: usize) {
        *self.fail_after.lock().unwrap_or_else(|e| e.into_inner()) = Some(successes);
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), NotifyError> {
        let limit = *self.fail_after.lock().unwrap_or_else(|e| e.into_inner());
        let mut sent = self.sent.lock().unwrap_or_else(|e| e.into_inner());
        if limit.is_some_and(|limit| sent.len() >= limit) {
            return Err(NotifyError(format!("mailbox for {} unreachable", recipient)));
        }
        sent.push((recipient.to_string(), message.to_string()));
        Ok(())
    }
}
