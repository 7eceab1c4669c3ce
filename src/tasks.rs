use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::engine::progression::{add_experience, subtract_experience};
use crate::error::ForjaError;
use crate::model::{NewTask, Task, UserStats};
use crate::notify::{ReminderSpec, TASK_PROMPT_ID};
use crate::state::app::AppState;

/// Result of a completion change. `stats` is `None` when the task already
/// had the requested state and nothing was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionChange {
    pub task: Task,
    pub stats: Option<UserStats>,
}

/// Insert a task and schedule its due-time reminder when it has one
pub fn add_task(state: &AppState, new: NewTask) -> Result<Task, ForjaError> {
    let task = state.track(state.store().insert_task(&new).map_err(ForjaError::from))?;
    state.metrics.record_task_added();

    if let Some(spec) = ReminderSpec::for_task(&task) {
        state.reminders().schedule_reminder(spec);
    }

    tracing::info!(
        id = task.id,
        category = %task.category,
        date = %task.date,
        due_time = ?task.due_time,
        "Task added"
    );
    Ok(task)
}

pub fn tasks_for(state: &AppState, date: NaiveDate) -> Result<Vec<Task>, ForjaError> {
    state.track(state.store().list_tasks_by_date(date).map_err(ForjaError::from))
}

fn require_task(state: &AppState, id: i64) -> Result<Task, ForjaError> {
    state
        .track(state.store().get_task(id).map_err(ForjaError::from))?
        .ok_or_else(|| ForjaError::not_found(format!("task {} not found", id), "tasks"))
}

/// Move a task to `completed`, granting or removing experience on a real
/// transition.
///
/// The completion write and the experience write are separate store calls;
/// if the second fails the task keeps its new state without the experience.
pub fn set_completion(state: &AppState, id: i64, completed: bool) -> Result<CompletionChange, ForjaError> {
    let mut task = require_task(state, id)?;
    if task.completed == completed {
        tracing::debug!(id = id, completed = completed, "Task already in requested state");
        return Ok(CompletionChange { task, stats: None });
    }

    state.track(
        state
            .store()
            .update_task_completion(id, completed)
            .map_err(ForjaError::from),
    )?;
    task.completed = completed;

    let stats = if completed {
        state.metrics.record_task_completed();
        add_experience(state.store(), task.category, state.config.experience_gain)
    } else {
        state.metrics.record_task_reopened();
        subtract_experience(state.store(), task.category, state.config.experience_loss)
    };
    let stats = state
        .track(stats)
        .map_err(|e| e.with_context(format!("task {} completion already saved", id)))?;

    Ok(CompletionChange {
        task,
        stats: Some(stats),
    })
}

/// Flip the completion state of a task
pub fn toggle_task(state: &AppState, id: i64) -> Result<CompletionChange, ForjaError> {
    let task = require_task(state, id)?;
    set_completion(state, id, !task.completed)
}

/// Delete a task and drop its pending reminder. Returns whether it existed.
pub fn delete_task(state: &AppState, id: i64) -> Result<bool, ForjaError> {
    let removed = state.track(state.store().delete_task(id).map_err(ForjaError::from))?;
    state.reminders().cancel(id);
    if removed {
        tracing::info!(id = id, "Task deleted");
    }
    Ok(removed)
}

/// Keep the "no tasks yet" prompt in sync with `date`. Returns whether the
/// date has tasks.
pub fn refresh_task_prompt(state: &AppState, date: NaiveDate) -> Result<bool, ForjaError> {
    let has_tasks = !tasks_for(state, date)?.is_empty();
    if has_tasks {
        state.reminders().cancel(TASK_PROMPT_ID);
    } else if !state.reminders().is_pending(TASK_PROMPT_ID) {
        state
            .reminders()
            .schedule_reminder(ReminderSpec::task_prompt(state.config.task_prompt()));
    }
    Ok(has_tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use chrono::{Duration, Local, NaiveTime};

    fn new_task(title: &str, category: Category) -> NewTask {
        NewTask {
            title: title.to_string(),
            category,
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            due_time: None,
        }
    }

    #[test]
    fn test_completion_grants_and_removes_experience() {
        let state = AppState::in_memory();
        let task = add_task(&state, new_task("Correr", Category::Salud)).unwrap();

        let change = set_completion(&state, task.id, true).unwrap();
        assert!(change.task.completed);
        assert_eq!(change.stats.unwrap().strength, 10);

        let change = set_completion(&state, task.id, false).unwrap();
        let stats = change.stats.unwrap();
        assert_eq!(stats.strength, 5);
        assert_eq!(stats.total_exp, 5);
    }

    #[test]
    fn test_unchanged_completion_is_noop() {
        let state = AppState::in_memory();
        let task = add_task(&state, new_task("Leer", Category::Estudio)).unwrap();
        set_completion(&state, task.id, true).unwrap();

        let change = set_completion(&state, task.id, true).unwrap();
        assert!(change.stats.is_none());
        assert_eq!(state.store().get_user_stats().unwrap().wisdom, 10);
    }

    #[test]
    fn test_unknown_task_is_not_found() {
        let state = AppState::in_memory();
        let err = set_completion(&state, 42, true).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn test_toggle_flips() {
        let state = AppState::in_memory();
        let task = add_task(&state, new_task("Informe", Category::Trabajo)).unwrap();
        assert!(toggle_task(&state, task.id).unwrap().task.completed);
        assert!(!toggle_task(&state, task.id).unwrap().task.completed);
    }

    #[test]
    fn test_due_task_reminder_scheduled_and_cancelled() {
        let state = AppState::in_memory();
        let tomorrow = Local::now().date_naive() + Duration::days(1);
        let task = add_task(
            &state,
            NewTask {
                title: "Llamar".into(),
                category: Category::Personal,
                date: tomorrow,
                due_time: NaiveTime::from_hms_opt(9, 30, 0),
            },
        )
        .unwrap();
        assert!(state.reminders().is_pending(task.id));

        assert!(delete_task(&state, task.id).unwrap());
        assert!(!state.reminders().is_pending(task.id));
        assert!(!delete_task(&state, task.id).unwrap());
    }

    #[test]
    fn test_task_prompt_follows_task_list() {
        let state = AppState::in_memory();
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

        assert!(!refresh_task_prompt(&state, date).unwrap());
        assert!(state.reminders().is_pending(TASK_PROMPT_ID));

        add_task(&state, new_task("Meditar", Category::Personal)).unwrap();
        assert!(refresh_task_prompt(&state, date).unwrap());
        assert!(!state.reminders().is_pending(TASK_PROMPT_ID));
    }
}
