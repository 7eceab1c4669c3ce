use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ForjaError;
use crate::model::{DailyLog, StreakRecord};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakOutcome {
    pub current: u32,
    pub best: u32,
}

impl From<&StreakRecord> for StreakOutcome {
    fn from(record: &StreakRecord) -> Self {
        StreakOutcome {
            current: record.current_streak,
            best: record.best_streak,
        }
    }
}

/// All-or-nothing daily goal. A day without tasks counts as met.
pub fn is_goal_met(log: &DailyLog) -> bool {
    log.completed_count == log.total_count
}

/// Signed calendar-day distance from `from` to `to`
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Updated(StreakRecord),
    /// `date` is earlier than the last completed date
    OutOfOrder,
}

/// Apply one day outcome to a record without touching storage.
pub fn advance(record: &StreakRecord, is_goal_met: bool, date: NaiveDate) -> Transition {
    let mut next = record.clone();

    if !is_goal_met {
        // last_completed_date keeps pointing at the last successful day
        next.current_streak = 0;
        return Transition::Updated(next);
    }

    match record.last_completed_date {
        None => next.current_streak = 1,
        Some(last) => match days_between(last, date) {
            d if d < 0 => return Transition::OutOfOrder,
            0 => {}
            1 => next.current_streak = record.current_streak.saturating_add(1),
            _ => next.current_streak = 1,
        },
    }

    next.last_completed_date = Some(date);
    next.best_streak = next.best_streak.max(next.current_streak);
    Transition::Updated(next)
}

/// Replay a closure history (oldest first) from an empty record.
/// `best_streak` never drops below `previous_best`.
pub fn rebuild_from_logs(logs: &[DailyLog], previous_best: u32) -> StreakRecord {
    let mut record = StreakRecord::default();
    for log in logs {
        if let Transition::Updated(next) = advance(&record, is_goal_met(log), log.date) {
            record = next;
        }
    }
    record.best_streak = record.best_streak.max(previous_best);
    record
}

/// Record one day closure and persist the new streak.
///
/// Closing a date earlier than the last completed date rebuilds the record
/// from the persisted daily logs instead of applying a delta.
pub fn update_streak(
    store: &dyn Store,
    is_goal_met: bool,
    date: NaiveDate,
) -> Result<StreakOutcome, ForjaError> {
    let record = store.get_streak_record()?;

    let next = match advance(&record, is_goal_met, date) {
        Transition::Updated(next) => next,
        Transition::OutOfOrder => {
            tracing::warn!(
                date = %date,
                last_completed = ?record.last_completed_date,
                "Out-of-order day closure, rebuilding streak from history"
            );
            let logs = store.list_all_logs()?;
            rebuild_from_logs(&logs, record.best_streak)
        }
    };

    store.set_streak_record(&next)?;
    tracing::info!(
        date = %date,
        goal_met = is_goal_met,
        current = next.current_streak,
        best = next.best_streak,
        "Streak updated"
    );
    Ok(StreakOutcome::from(&next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn test_first_success_starts_at_one() {
        let store = MemoryStore::new();
        let outcome = update_streak(&store, true, day(1)).unwrap();
        assert_eq!(outcome, StreakOutcome { current: 1, best: 1 });
    }

    #[test]
    fn test_consecutive_days_extend_streak() {
        let store = MemoryStore::new();
        for d in 1..=5 {
            update_streak(&store, true, day(d)).unwrap();
        }
        let record = store.get_streak_record().unwrap();
        assert_eq!(record.current_streak, 5);
        assert_eq!(record.best_streak, 5);
        assert_eq!(record.last_completed_date, Some(day(5)));
    }

    #[test]
    fn test_gap_restarts_at_one_and_keeps_best() {
        let store = MemoryStore::new();
        for d in 1..=3 {
            update_streak(&store, true, day(d)).unwrap();
        }
        let outcome = update_streak(&store, true, day(6)).unwrap();
        assert_eq!(outcome, StreakOutcome { current: 1, best: 3 });
    }

    #[test]
    fn test_failure_resets_but_keeps_last_date() {
        let store = MemoryStore::new();
        update_streak(&store, true, day(1)).unwrap();
        update_streak(&store, true, day(2)).unwrap();
        let outcome = update_streak(&store, false, day(3)).unwrap();

        assert_eq!(outcome, StreakOutcome { current: 0, best: 2 });
        assert_eq!(
            store.get_streak_record().unwrap().last_completed_date,
            Some(day(2))
        );
    }

    #[test]
    fn test_same_day_reclosure_is_idempotent() {
        let store = MemoryStore::new();
        update_streak(&store, true, day(1)).unwrap();
        update_streak(&store, true, day(2)).unwrap();
        let again = update_streak(&store, true, day(2)).unwrap();
        assert_eq!(again.current, 2);
    }

    #[test]
    fn test_zero_task_day_counts_as_met() {
        let log = DailyLog::new(day(1), 0, 0);
        assert!(is_goal_met(&log));
        assert!(!is_goal_met(&DailyLog::new(day(1), 2, 3)));
    }

    #[test]
    fn test_out_of_order_closure_rebuilds_from_history() {
        let store = MemoryStore::new();
        for d in [1, 2, 4] {
            store.upsert_daily_log(&DailyLog::new(day(d), 1, 1)).unwrap();
            update_streak(&store, true, day(d)).unwrap();
        }
        // day 3 closed late: 1..=4 becomes one run
        store.upsert_daily_log(&DailyLog::new(day(3), 2, 2)).unwrap();
        let outcome = update_streak(&store, true, day(3)).unwrap();

        assert_eq!(outcome, StreakOutcome { current: 4, best: 4 });
        assert_eq!(
            store.get_streak_record().unwrap().last_completed_date,
            Some(day(4))
        );
    }

    #[test]
    fn test_rebuild_never_lowers_best() {
        let logs = vec![DailyLog::new(day(1), 1, 1), DailyLog::new(day(2), 0, 1)];
        let record = rebuild_from_logs(&logs, 9);
        assert_eq!(record.current_streak, 0);
        assert_eq!(record.best_streak, 9);
        assert_eq!(record.last_completed_date, Some(day(1)));
    }

    #[test]
    fn test_best_never_decreases_over_mixed_sequence() {
        let store = MemoryStore::new();
        let outcomes = [true, true, false, true, true, true, false, true];
        let mut best = 0;
        for (i, met) in outcomes.iter().enumerate() {
            let out = update_streak(&store, *met, day(i as u32 + 1)).unwrap();
            assert!(out.best >= best);
            assert!(out.best >= out.current);
            best = out.best;
        }
        assert_eq!(best, 3);
    }
}
