//! Background reminder worker

use std::{sync::Arc, time::Duration as StdDuration};

use chrono::{Duration, NaiveDateTime};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, error, info, warn};

use crate::{
    mail::{templates, Mailer},
    storage::{self, database::Database},
    structs::configuration::Configuration,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub selected: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Sends every reminder that is due at `now`. A delivered reminder is
/// re-armed one repeat interval after `now`, a failed one stays due and is
/// retried by the next pass. The database lock is never held while sending.
pub async fn run_reminder_pass(
    data: &Mutex<Database>,
    mailer: &dyn Mailer,
    configuration: &Configuration,
    now: NaiveDateTime,
) -> Result<PassReport, sqlite::Error> {
    let due = data.lock().await.due_reminders(now)?;
    let mut report = PassReport { selected: due.len(), ..PassReport::default() };

    let step = Duration::days(configuration.reminders.repeat_after_days);
    let link = configuration.link("/protocols/new");

    for reminder in due {
        let notification = templates::reminder(&reminder.name, &link);
        match mailer.send(&reminder.email, &notification.subject, &notification.body).await {
            Ok(_) => {
                data.lock().await.advance_reminder(reminder.id, now, step)?;
                report.sent += 1;
                debug!("Sent reminder {} (#{}) to user {}", reminder.id, reminder.reminder_count + 1, reminder.user_id);
            }
            Err(err) => {
                report.failed += 1;
                warn!("Reminder {} for user {} not delivered, retrying next pass: {}", reminder.id, reminder.user_id, err);
            }
        }
    }

    Ok(report)
}

/// Handle of the spawned worker loop.
pub struct ReminderWorker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ReminderWorker {
    /// Starts polling. The first pass runs immediately, every later one a full
    /// interval after the previous pass ended at the earliest.
    pub fn spawn(data: Arc<Mutex<Database>>, mailer: Arc<dyn Mailer>, configuration: Configuration) -> ReminderWorker {
        let (shutdown, mut stop) = watch::channel(false);
        let poll_interval = StdDuration::from_secs(configuration.reminders.poll_interval_secs.max(1));

        let handle = tokio::spawn(async move {
            info!("Reminder worker started, polling every {:?}", poll_interval);
            let mut interval = tokio::time::interval(poll_interval);
            // A pass that outlasts the interval must not trigger catch-up passes.
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match run_reminder_pass(&data, mailer.as_ref(), &configuration, storage::now()).await {
                            Ok(report) if report.selected > 0 => info!(
                                "Reminder pass: {} due, {} sent, {} failed",
                                report.selected, report.sent, report.failed
                            ),
                            Ok(_) => debug!("Reminder pass: nothing due"),
                            Err(err) => error!("Reminder pass aborted: {}", err),
                        }
                    }
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Reminder worker stopped");
        });

        ReminderWorker { shutdown, handle }
    }

    /// Signals the loop to stop and waits for the running pass to finish.
    pub async fn shutdown(self) {
        if self.shutdown.send(true).is_err() {
            debug!("Reminder worker already gone");
        }
        if let Err(err) = self.handle.await {
            error!("Reminder worker panicked: {}", err);
        }
    }
}
