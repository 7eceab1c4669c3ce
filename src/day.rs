use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::engine::percent;
use crate::engine::streak::{is_goal_met, update_streak, StreakOutcome};
use crate::error::ForjaError;
use crate::model::{Category, DailyLog};
use crate::state::app::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionStats {
    pub total: u32,
    pub completed: u32,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayClosure {
    pub log: DailyLog,
    pub goal_met: bool,
    pub streak: StreakOutcome,
}

pub fn completion_stats(state: &AppState, date: NaiveDate) -> Result<CompletionStats, ForjaError> {
    let tasks = crate::tasks::tasks_for(state, date)?;
    let total = tasks.len() as u32;
    let completed = tasks.iter().filter(|t| t.completed).count() as u32;
    let percentage = if total > 0 {
        percent(completed as f64 * 100.0 / total as f64)
    } else {
        0
    };

    Ok(CompletionStats {
        total,
        completed,
        percentage,
    })
}

/// Close `date`: snapshot its tasks into a daily log, then advance the streak.
///
/// Re-closing a date overwrites its log. The log write and the streak write
/// are independent; a failure in the second leaves the first in place.
pub fn close_day(
    state: &AppState,
    date: NaiveDate,
    reflection: Option<String>,
) -> Result<DayClosure, ForjaError> {
    let stats = completion_stats(state, date)?;

    let mut log = DailyLog::new(date, stats.completed, stats.total);
    log.reflection = reflection
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    let log = state.track(state.store().upsert_daily_log(&log).map_err(ForjaError::from))?;
    let goal_met = is_goal_met(&log);
    let streak = state
        .track(update_streak(state.store(), goal_met, date))
        .map_err(|e| e.with_context(format!("daily log for {} already saved", date)))?;

    state.metrics.record_day_closed();
    tracing::info!(
        date = %date,
        completed = log.completed_count,
        total = log.total_count,
        goal_met = goal_met,
        streak = streak.current,
        "Day closed"
    );

    Ok(DayClosure {
        log,
        goal_met,
        streak,
    })
}

/// Most recent daily logs first
pub fn history(state: &AppState, limit: usize) -> Result<Vec<DailyLog>, ForjaError> {
    state.track(state.store().list_recent_logs(limit).map_err(ForjaError::from))
}

/// Earliest day before `before` that has tasks but was never closed
pub fn pending_closure(state: &AppState, before: NaiveDate) -> Result<Option<NaiveDate>, ForjaError> {
    state.track(
        state
            .store()
            .pending_closure_date(before)
            .map_err(ForjaError::from),
    )
}

/// Completed-task counts per category; categories without completions are
/// reported as zero.
pub fn category_completion(state: &AppState) -> Result<BTreeMap<Category, u32>, ForjaError> {
    let counts = state.track(
        state
            .store()
            .completed_counts_by_category()
            .map_err(ForjaError::from),
    )?;
    Ok(Category::ALL
        .iter()
        .map(|c| (*c, counts.get(c).copied().unwrap_or(0)))
        .collect())
}
