//! Local reminders as an injected capability. The core only states intents
//! (`schedule_reminder` / `cancel`) and never waits on delivery.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, Local, NaiveDateTime, NaiveTime};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::model::Task;

/// Daily "examine your day" reminder
pub const REFLECTION_REMINDER_ID: i64 = 9999;
/// Daily prompt shown while the day has no tasks
pub const TASK_PROMPT_ID: i64 = 8888;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    /// Fire once at a local date-time
    At(NaiveDateTime),
    /// Fire every day at a local time
    Daily(NaiveTime),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSpec {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub trigger: Trigger,
}

impl ReminderSpec {
    /// One-shot reminder at the task's due time; `None` without a due time
    pub fn for_task(task: &Task) -> Option<Self> {
        let due = task.due_time?;
        Some(ReminderSpec {
            id: task.id,
            title: "¡Es hora de forjar!".to_string(),
            body: format!("Desafío pendiente: {}", task.title),
            trigger: Trigger::At(task.date.and_time(due)),
        })
    }

    pub fn reflection(at: NaiveTime) -> Self {
        ReminderSpec {
            id: REFLECTION_REMINDER_ID,
            title: "Juicio del Día".to_string(),
            body: "Es hora de examinar tu jornada. Forja tu voluntad.".to_string(),
            trigger: Trigger::Daily(at),
        }
    }

    pub fn task_prompt(at: NaiveTime) -> Self {
        ReminderSpec {
            id: TASK_PROMPT_ID,
            title: "Forja tu Voluntad".to_string(),
            body: "No has forjado ningún desafío para hoy. ¡Empieza ahora!".to_string(),
            trigger: Trigger::Daily(at),
        }
    }
}

/// Next instant strictly after `now` at which `trigger` fires, if any
pub fn next_fire(trigger: &Trigger, now: NaiveDateTime) -> Option<NaiveDateTime> {
    match trigger {
        Trigger::At(at) => (*at > now).then_some(*at),
        Trigger::Daily(time) => {
            let today = now.date().and_time(*time);
            if today > now {
                Some(today)
            } else {
                Some(today + Duration::days(1))
            }
        }
    }
}

pub trait ReminderScheduler: Send + Sync {
    /// Replace any pending reminder with the same id
    fn schedule_reminder(&self, spec: ReminderSpec);
    fn cancel(&self, id: i64);
    fn is_pending(&self, id: i64) -> bool;
}

/// Records reminder intents without delivering them. Used by one-shot CLI
/// runs, where the process exits before anything would fire.
#[derive(Default)]
pub struct LogScheduler {
    pending: Mutex<BTreeMap<i64, ReminderSpec>>,
}

impl LogScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Vec<ReminderSpec> {
        self.pending.lock().values().cloned().collect()
    }
}

impl ReminderScheduler for LogScheduler {
    fn schedule_reminder(&self, spec: ReminderSpec) {
        if next_fire(&spec.trigger, Local::now().naive_local()).is_none() {
            tracing::debug!(id = spec.id, "Reminder time already passed, not scheduling");
            return;
        }
        tracing::info!(id = spec.id, trigger = ?spec.trigger, "Reminder scheduled");
        self.pending.lock().insert(spec.id, spec);
    }

    fn cancel(&self, id: i64) {
        if self.pending.lock().remove(&id).is_some() {
            tracing::info!(id = id, "Reminder cancelled");
        }
    }

    fn is_pending(&self, id: i64) -> bool {
        self.pending.lock().contains_key(&id)
    }
}

pub type ReminderSink = Arc<dyn Fn(&ReminderSpec) + Send + Sync>;

/// A spawned timer. `generation` tells a timer apart from a later one with the same id.
struct Timer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Delivers reminders from timers on a tokio runtime.
pub struct TokioScheduler {
    runtime: tokio::runtime::Handle,
    timers: Arc<Mutex<HashMap<i64, Timer>>>,
    next_generation: AtomicU64,
    sink: ReminderSink,
}

impl TokioScheduler {
    /// Must be called from within a tokio runtime
    pub fn new() -> Self {
        Self::with_sink(Arc::new(|spec: &ReminderSpec| {
            tracing::info!(id = spec.id, title = %spec.title, body = %spec.body, "Reminder due");
        }))
    }

    pub fn with_sink(sink: ReminderSink) -> Self {
        TokioScheduler {
            runtime: tokio::runtime::Handle::current(),
            timers: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            sink,
        }
    }
}

async fn sleep_until_local(target: NaiveDateTime) {
    let wait = (target - Local::now().naive_local())
        .to_std()
        .unwrap_or_default();
    tokio::time::sleep(wait).await;
}

impl ReminderScheduler for TokioScheduler {
    fn schedule_reminder(&self, spec: ReminderSpec) {
        let Some(first) = next_fire(&spec.trigger, Local::now().naive_local()) else {
            tracing::debug!(id = spec.id, "Reminder time already passed, not scheduling");
            return;
        };

        let id = spec.id;
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let sink = self.sink.clone();
        let timers = self.timers.clone();
        let handle = self.runtime.spawn(async move {
            let mut target = first;
            loop {
                sleep_until_local(target).await;
                sink(&spec);
                match next_fire(&spec.trigger, target) {
                    Some(next) if matches!(spec.trigger, Trigger::Daily(_)) => target = next,
                    _ => break,
                }
            }
            // The sink may have rescheduled this id; leave the newer timer alone
            let mut timers = timers.lock();
            if timers.get(&id).map(|t| t.generation) == Some(generation) {
                timers.remove(&id);
            }
        });

        if let Some(previous) = self.timers.lock().insert(id, Timer { generation, handle }) {
            previous.handle.abort();
        }
        tracing::info!(id = id, at = %first, "Reminder scheduled");
    }

    fn cancel(&self, id: i64) {
        if let Some(timer) = self.timers.lock().remove(&id) {
            timer.handle.abort();
            tracing::info!(id = id, "Reminder cancelled");
        }
    }

    fn is_pending(&self, id: i64) -> bool {
        self.timers
            .lock()
            .get(&id)
            .map(|t| !t.handle.is_finished())
            .unwrap_or(false)
    }
}

/// Schedule the daily reflection reminder unless it is already pending
pub fn ensure_reflection_reminder(scheduler: &dyn ReminderScheduler, at: NaiveTime) {
    if !scheduler.is_pending(REFLECTION_REMINDER_ID) {
        scheduler.schedule_reminder(ReminderSpec::reflection(at));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 19)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_next_fire_one_shot() {
        assert_eq!(next_fire(&Trigger::At(at(14, 0)), at(9, 0)), Some(at(14, 0)));
        assert_eq!(next_fire(&Trigger::At(at(14, 0)), at(15, 0)), None);
    }

    #[test]
    fn test_next_fire_daily_rolls_over() {
        let daily = Trigger::Daily(NaiveTime::from_hms_opt(21, 0, 0).unwrap());
        assert_eq!(next_fire(&daily, at(20, 0)), Some(at(21, 0)));
        assert_eq!(
            next_fire(&daily, at(21, 0)),
            Some(at(21, 0) + Duration::days(1))
        );
    }

    #[test]
    fn test_task_reminder_needs_due_time() {
        let mut task = Task {
            id: 3,
            title: "Leer".into(),
            completed: false,
            category: crate::model::Category::Estudio,
            date: NaiveDate::from_ymd_opt(2026, 2, 19).unwrap(),
            due_time: None,
        };
        assert!(ReminderSpec::for_task(&task).is_none());

        task.due_time = NaiveTime::from_hms_opt(14, 0, 0);
        let spec = ReminderSpec::for_task(&task).unwrap();
        assert_eq!(spec.id, 3);
        assert_eq!(spec.trigger, Trigger::At(at(14, 0)));
        assert!(spec.body.contains("Leer"));
    }

    #[test]
    fn test_log_scheduler_tracks_intents() {
        let scheduler = LogScheduler::new();
        let time = NaiveTime::from_hms_opt(21, 0, 0).unwrap();
        ensure_reflection_reminder(&scheduler, time);
        ensure_reflection_reminder(&scheduler, time);
        assert_eq!(scheduler.pending().len(), 1);

        scheduler.cancel(REFLECTION_REMINDER_ID);
        assert!(!scheduler.is_pending(REFLECTION_REMINDER_ID));
    }

    #[test]
    fn test_log_scheduler_skips_past_one_shot() {
        let scheduler = LogScheduler::new();
        scheduler.schedule_reminder(ReminderSpec {
            id: 1,
            title: "t".into(),
            body: "b".into(),
            trigger: Trigger::At(at(0, 0) - Duration::days(3650)),
        });
        assert!(!scheduler.is_pending(1));
    }

    #[tokio::test]
    async fn test_tokio_scheduler_cancel_aborts_timer() {
        let scheduler = TokioScheduler::new();
        scheduler.schedule_reminder(ReminderSpec::task_prompt(
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        ));
        assert!(scheduler.is_pending(TASK_PROMPT_ID));

        scheduler.cancel(TASK_PROMPT_ID);
        assert!(!scheduler.is_pending(TASK_PROMPT_ID));
    }

    #[tokio::test]
    async fn test_tokio_scheduler_fires_due_reminder() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let seen = fired.clone();
        let scheduler = TokioScheduler::with_sink(Arc::new(move |spec: &ReminderSpec| {
            seen.lock().push(spec.id);
        }));

        let soon = Local::now().naive_local() + Duration::milliseconds(20);
        scheduler.schedule_reminder(ReminderSpec {
            id: 7,
            title: "t".into(),
            body: "b".into(),
            trigger: Trigger::At(soon),
        });

        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert_eq!(*fired.lock(), vec![7]);
        assert!(!scheduler.is_pending(7));
    }

    #[tokio::test]
    async fn test_finished_timer_keeps_rescheduled_reminder() {
        let cell: Arc<Mutex<Option<Arc<TokioScheduler>>>> = Arc::new(Mutex::new(None));
        let inner = cell.clone();
        let scheduler = Arc::new(TokioScheduler::with_sink(Arc::new(move |spec: &ReminderSpec| {
            if let Trigger::At(_) = spec.trigger {
                let scheduler = inner.lock().clone();
                if let Some(scheduler) = scheduler {
                    let later = (Local::now() + Duration::hours(1)).time();
                    scheduler.schedule_reminder(ReminderSpec {
                        trigger: Trigger::Daily(later),
                        ..spec.clone()
                    });
                }
            }
        })));
        *cell.lock() = Some(scheduler.clone());

        let soon = Local::now().naive_local() + Duration::milliseconds(20);
        scheduler.schedule_reminder(ReminderSpec {
            id: 7,
            title: "t".into(),
            body: "b".into(),
            trigger: Trigger::At(soon),
        });

        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert!(scheduler.is_pending(7));

        scheduler.cancel(7);
        assert!(!scheduler.is_pending(7));
        cell.lock().take();
    }
}
