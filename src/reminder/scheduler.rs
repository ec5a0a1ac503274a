use actix_web::rt;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::pipeline::ReminderPipeline;

/// Runs the pipeline every `every`, starting immediately.
///
/// Runs from this loop never overlap each other; a slow run delays the next
/// tick instead of stacking. A failed run is logged and the loop carries on.
pub fn spawn_reminder_loop(pipeline: Arc<ReminderPipeline>, every: Duration) -> JoinHandle<()> {
    info!("reminder loop every {:?}", every);
    rt::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match pipeline.run().await {
                Ok(report) if report.notified > 0 => info!(
                    "periodic reminder run sent {} reminders in {} commits",
                    report.notified, report.commits
                ),
                Ok(_) => {}
                Err(e) => error!("periodic reminder run failed: {}", e),
            }
        }
    })
}
