// src/reminder_scheduler.rs - Reminder scheduler module
use std::sync::{Arc, Mutex as StdMutex, Weak};

use chrono::{DateTime, Utc};
use log::{debug, error, info, trace, warn};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};

use crate::{Config, Notepad, NotepadError, Result, REMINDER_TITLE};

/// Scans todos once and fires a reminder for each one that is due.
///
/// Skipped entirely while notifications are switched off, so no flag is
/// advanced for todos that become due in that window. Returns how many
/// reminders were sent.
pub fn run_reminder_pass(notepad: &mut Notepad) -> Result<usize> {
    if !notepad.settings().notifications {
        trace!("Notifications disabled, skipping reminder scan");
        return Ok(0);
    }

    let now = notepad.now();
    let due: Vec<usize> = notepad
        .todos()
        .iter()
        .enumerate()
        .filter(|(_, todo)| todo.is_due(now))
        .map(|(index, _)| index)
        .collect();

    let mut fired = 0;
    for index in due {
        let body = notepad.store.todos[index].text.clone();
        match notepad.notifier().notify(REMINDER_TITLE, &body) {
            Ok(()) => {
                notepad.store.todos[index].notified = true;
                fired += 1;
                debug!("Reminder sent for task {}", notepad.store.todos[index].id);
            }
            Err(e) => error!("Failed to send reminder for '{}': {}", body, e),
        }
    }

    if fired > 0 {
        notepad.store.save_todos()?;
        info!("Sent {} reminder(s)", fired);
    }
    Ok(fired)
}

#[derive(Debug, Clone, Default)]
pub struct ReminderSchedulerStatus {
    /// Whether the scheduler is running
    pub is_running: bool,
    /// When the last scan ran
    pub last_check: Option<DateTime<Utc>>,
    /// Reminders sent since the scheduler started
    pub total_fired: usize,
}

#[derive(Debug)]
pub enum ReminderCommand {
    /// Scan immediately and report how many reminders fired
    CheckNow(oneshot::Sender<Result<usize>>),
    /// Stop the reminder scheduler
    Stop,
}

pub struct ReminderScheduler {
    /// Time between scans
    period: Duration,

    /// Channel to send commands to the scheduler task
    command_tx: mpsc::Sender<ReminderCommand>,

    /// Handle to the scheduler task
    scheduler_task: Option<JoinHandle<()>>,

    /// Status shared with the scheduler task
    status: Arc<StdMutex<ReminderSchedulerStatus>>,

    /// Weak reference to the notepad
    notepad: Option<Weak<Mutex<Notepad>>>,
}

impl ReminderScheduler {
    /// Create a new reminder scheduler with the provided config
    pub fn new(config: &Config) -> Self {
        info!(
            "Initializing reminder scheduler (every {}s)",
            config.reminder_interval_secs
        );
        let (command_tx, _) = mpsc::channel(10);

        Self {
            period: Duration::from_secs(config.reminder_interval_secs.max(1)),
            command_tx,
            scheduler_task: None,
            status: Arc::new(StdMutex::new(ReminderSchedulerStatus::default())),
            notepad: None,
        }
    }

    /// Set the weak reference to the notepad
    pub fn set_notepad(&mut self, notepad: &Arc<Mutex<Notepad>>) {
        self.notepad = Some(Arc::downgrade(notepad));
        debug!("Notepad reference set in ReminderScheduler.");
    }

    /// Start the scheduler. The first scan runs right away.
    pub async fn start(&mut self) -> Result<()> {
        if self.scheduler_task.is_some() {
            debug!("Reminder scheduler already running");
            return Ok(());
        }

        let notepad = match &self.notepad {
            Some(weak) if weak.upgrade().is_some() => weak.clone(),
            Some(_) => {
                error!("Notepad reference is no longer valid.");
                return Err(NotepadError::SchedulerError {
                    message: "Notepad reference is no longer valid.".to_string(),
                });
            }
            None => {
                error!("No notepad reference found in ReminderScheduler.");
                return Err(NotepadError::SchedulerError {
                    message: "ReminderScheduler does not have a notepad reference.".to_string(),
                });
            }
        };

        let (command_tx, mut command_rx) = mpsc::channel(10);
        self.command_tx = command_tx;

        let period = self.period;
        let status = Arc::clone(&self.status);

        let task = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    _ = interval.tick() => {
                        match scan(&notepad, &status).await {
                            Some(Ok(fired)) => trace!("Scheduled scan fired {} reminder(s)", fired),
                            Some(Err(e)) => error!("Scheduled reminder scan failed: {}", e),
                            None => {
                                warn!("Notepad dropped, reminder scheduler exiting");
                                break;
                            }
                        }
                    }
                    Some(cmd) = command_rx.recv() => match cmd {
                        ReminderCommand::CheckNow(reply) => {
                            let result = scan(&notepad, &status).await.unwrap_or_else(|| {
                                Err(NotepadError::SchedulerError {
                                    message: "Notepad is no longer available".to_string(),
                                })
                            });
                            if reply.send(result).is_err() {
                                debug!("CheckNow caller went away before the reply");
                            }
                        },
                        ReminderCommand::Stop => {
                            info!("Reminder scheduler stopping...");
                            break;
                        }
                    }
                }
            }
        });

        self.scheduler_task = Some(task);
        set_running(&self.status, true);
        info!("Reminder scheduler started");

        Ok(())
    }

    /// Stop the reminder scheduler if it's running
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.scheduler_task.take() {
            // The task may already have exited on its own.
            if let Err(e) = self.command_tx.send(ReminderCommand::Stop).await {
                debug!("Stop command not delivered: {}", e);
            }

            if let Err(e) = task.await {
                let error_msg = format!("Failed to stop reminder scheduler: {}", e);
                error!("{}", error_msg);
                return Err(NotepadError::SchedulerError { message: error_msg });
            }

            set_running(&self.status, false);
            info!("Reminder scheduler stopped");
        } else {
            debug!("Reminder scheduler is not running");
        }

        Ok(())
    }

    /// Run a scan immediately, regardless of the schedule
    pub async fn check_now(&self) -> Result<usize> {
        if self.scheduler_task.is_none() {
            return Err(NotepadError::SchedulerError {
                message: "Reminder scheduler is not running".to_string(),
            });
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(ReminderCommand::CheckNow(reply_tx))
            .await
            .map_err(|e| NotepadError::SchedulerError {
                message: format!("Failed to send check command: {}", e),
            })?;

        reply_rx.await.map_err(|e| NotepadError::SchedulerError {
            message: format!("Scheduler did not answer: {}", e),
        })?
    }

    /// Get the current status of the reminder scheduler
    pub fn get_status(&self) -> ReminderSchedulerStatus {
        match self.status.lock() {
            Ok(status) => status.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

async fn scan(
    notepad: &Weak<Mutex<Notepad>>,
    status: &StdMutex<ReminderSchedulerStatus>,
) -> Option<Result<usize>> {
    let notepad = notepad.upgrade()?;
    let mut guard = notepad.lock().await;
    let result = run_reminder_pass(&mut guard);

    if let Ok(mut status) = status.lock() {
        status.last_check = Some(guard.now());
        if let Ok(fired) = &result {
            status.total_fired += fired;
        }
    }
    Some(result)
}

fn set_running(status: &StdMutex<ReminderSchedulerStatus>, running: bool) {
    if let Ok(mut status) = status.lock() {
        status.is_running = running;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedClock, MemoryBackend, Notification, RecordingNotifier, Store};
    use chrono::Duration as ChronoDuration;
    use pretty_assertions::assert_eq;

    fn at(value: &str) -> DateTime<Utc> {
        value.parse().unwrap()
    }

    fn setup(now: &str) -> (Notepad, Arc<FixedClock>, Arc<RecordingNotifier>) {
        let clock = Arc::new(FixedClock::new(at(now)));
        let notifier = Arc::new(RecordingNotifier::default());
        let notepad = Notepad::new(
            Store::load(MemoryBackend::new()),
            clock.clone(),
            notifier.clone(),
        );
        (notepad, clock, notifier)
    }

    #[test]
    fn due_todo_fires_exactly_once() {
        let (mut notepad, _, notifier) = setup("2024-01-02T00:00:00Z");
        notepad
            .create_todo("Pay rent", Some(at("2024-01-01T00:00:00Z")))
            .unwrap();

        assert_eq!(run_reminder_pass(&mut notepad).unwrap(), 1);
        assert!(notepad.todos()[0].notified);
        assert_eq!(
            notifier.sent(),
            vec![Notification {
                title: "Task Reminder".to_string(),
                body: "Pay rent".to_string(),
            }]
        );

        assert_eq!(run_reminder_pass(&mut notepad).unwrap(), 0);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[test]
    fn future_completed_and_timeless_todos_do_not_fire() {
        let (mut notepad, clock, notifier) = setup("2024-01-02T00:00:00Z");
        notepad
            .create_todo("later", Some(at("2024-01-03T00:00:00Z")))
            .unwrap();
        let done = notepad
            .create_todo("done", Some(at("2024-01-01T00:00:00Z")))
            .unwrap();
        notepad.toggle_todo_completed(&done.id).unwrap();
        notepad.create_todo("whenever", None).unwrap();

        assert_eq!(run_reminder_pass(&mut notepad).unwrap(), 0);
        assert!(notifier.sent().is_empty());

        clock.advance(ChronoDuration::days(1));
        assert_eq!(run_reminder_pass(&mut notepad).unwrap(), 1);
        assert_eq!(notifier.sent()[0].body, "later");
        assert!(!notepad.todos()[1].notified);
    }

    #[test]
    fn all_due_todos_fire_in_one_pass() {
        let (mut notepad, _, notifier) = setup("2024-01-02T00:00:00Z");
        for text in ["a", "b", "c"] {
            notepad
                .create_todo(text, Some(at("2024-01-01T12:00:00Z")))
                .unwrap();
        }

        assert_eq!(run_reminder_pass(&mut notepad).unwrap(), 3);
        let bodies: Vec<_> = notifier.sent().into_iter().map(|n| n.body).collect();
        assert_eq!(bodies, vec!["a", "b", "c"]);
    }

    #[test]
    fn disabled_notifications_skip_the_scan_without_advancing_flags() {
        let (mut notepad, _, notifier) = setup("2024-01-02T00:00:00Z");
        notepad.set_notifications(false).unwrap();
        notepad
            .create_todo("Pay rent", Some(at("2024-01-01T00:00:00Z")))
            .unwrap();

        assert_eq!(run_reminder_pass(&mut notepad).unwrap(), 0);
        assert!(!notepad.todos()[0].notified);

        notepad.set_notifications(true).unwrap();
        assert_eq!(run_reminder_pass(&mut notepad).unwrap(), 1);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn scheduler_scans_at_start_and_on_demand() {
        let (mut notepad, clock, notifier) = setup("2024-01-02T00:00:00Z");
        notepad
            .create_todo("Pay rent", Some(at("2024-01-01T00:00:00Z")))
            .unwrap();
        notepad
            .create_todo("Call bank", Some(at("2024-01-02T00:30:00Z")))
            .unwrap();
        let notepad = Arc::new(Mutex::new(notepad));

        let mut scheduler = ReminderScheduler::new(&Config::default());
        scheduler.set_notepad(&notepad);
        scheduler.start().await.unwrap();
        assert!(scheduler.get_status().is_running);

        // Queued behind the startup scan, which already sent "Pay rent".
        assert_eq!(scheduler.check_now().await.unwrap(), 0);
        assert_eq!(notifier.sent().len(), 1);

        clock.advance(ChronoDuration::hours(1));
        assert_eq!(scheduler.check_now().await.unwrap(), 1);

        scheduler.stop().await.unwrap();
        let status = scheduler.get_status();
        assert!(!status.is_running);
        assert_eq!(status.total_fired, 2);
        assert_eq!(status.last_check, Some(at("2024-01-02T01:00:00Z")));
        assert!(notepad.lock().await.todos().iter().all(|t| t.notified));
    }

    async fn yield_until(mut ready: impl FnMut() -> bool) {
        for _ in 0..100 {
            if ready() {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_rescans_every_period_without_a_trigger() {
        let (mut notepad, clock, notifier) = setup("2024-01-02T00:00:00Z");
        notepad
            .create_todo("Call bank", Some(at("2024-01-02T00:30:00Z")))
            .unwrap();
        let notepad = Arc::new(Mutex::new(notepad));

        let mut scheduler = ReminderScheduler::new(&Config::default());
        scheduler.set_notepad(&notepad);
        scheduler.start().await.unwrap();

        yield_until(|| scheduler.get_status().last_check.is_some()).await;
        assert!(notifier.sent().is_empty());
        assert_eq!(scheduler.get_status().total_fired, 0);

        clock.advance(ChronoDuration::hours(1));
        time::advance(Duration::from_secs(60)).await;
        yield_until(|| scheduler.get_status().total_fired > 0).await;

        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(notifier.sent()[0].body, "Call bank");
        let status = scheduler.get_status();
        assert_eq!(status.total_fired, 1);
        assert_eq!(status.last_check, Some(at("2024-01-02T01:00:00Z")));
        assert!(notepad.lock().await.todos()[0].notified);

        scheduler.stop().await.unwrap();
    }

    #[tokio::test]
    async fn start_without_notepad_fails() {
        let mut scheduler = ReminderScheduler::new(&Config::default());
        assert!(matches!(
            scheduler.start().await,
            Err(NotepadError::SchedulerError { .. })
        ));
        assert!(scheduler.check_now().await.is_err());
    }
}
