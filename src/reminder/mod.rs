pub mod notifier;
pub mod pipeline;
pub mod scheduler;

pub use notifier::{reminder_message, LogNotifier, Notifier, NotifyError, RecordingNotifier};
pub use pipeline::{ReminderPipeline, ReminderReport};
pub use scheduler::spawn_reminder_loop;
