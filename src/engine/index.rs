use serde::{Deserialize, Serialize};

use crate::engine::{percent, HISTORY_WINDOW};
use crate::error::ForjaError;
use crate::model::DailyLog;
use crate::store::Store;

/// Streak length that earns the full streak bonus
pub const STREAK_TARGET_DAYS: f64 = 30.0;
pub const COMPLETION_WEIGHT: f64 = 0.6;
pub const STREAK_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForjaIndex {
    pub index: u32,
    pub avg_completion: u32,
    pub streak_bonus: u32,
}

/// Mean completion ratio of `logs` in `[0, 1]`; days without tasks count as perfect
fn mean_completion(logs: &[DailyLog]) -> f64 {
    if logs.is_empty() {
        return 0.0;
    }
    let sum: f64 = logs
        .iter()
        .map(|log| log.completion_ratio().unwrap_or(1.0))
        .sum();
    sum / logs.len() as f64
}

/// Pure formula over already-loaded inputs. The index blends the rounded
/// parts, so it always agrees with the values reported next to it.
pub fn compute_index(recent_logs: &[DailyLog], current_streak: u32) -> ForjaIndex {
    let avg_completion = percent(mean_completion(recent_logs) * 100.0);
    let streak_bonus = percent((current_streak as f64 / STREAK_TARGET_DAYS).min(1.0) * 100.0);

    ForjaIndex {
        index: percent(
            avg_completion as f64 * COMPLETION_WEIGHT + streak_bonus as f64 * STREAK_WEIGHT,
        ),
        avg_completion,
        streak_bonus,
    }
}

/// Forja Index from the last 14 closures and the current streak. Read-only.
pub fn forja_index(store: &dyn Store) -> Result<ForjaIndex, ForjaError> {
    let logs = store.list_recent_logs(HISTORY_WINDOW)?;
    let streak = store.get_streak_record()?;
    let index = compute_index(&logs, streak.current_streak);
    tracing::debug!(
        logs = logs.len(),
        streak = streak.current_streak,
        index = index.index,
        "Computed Forja Index"
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StreakRecord;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
    }

    #[test]
    fn test_empty_history_is_zero() {
        let store = MemoryStore::new();
        let idx = forja_index(&store).unwrap();
        assert_eq!(idx.index, 0);
        assert_eq!(idx.avg_completion, 0);
        assert_eq!(idx.streak_bonus, 0);
    }

    #[test]
    fn test_weighted_blend() {
        let store = MemoryStore::new();
        store.upsert_daily_log(&DailyLog::new(day(18), 10, 10)).unwrap();
        store.upsert_daily_log(&DailyLog::new(day(19), 0, 10)).unwrap();
        store
            .set_streak_record(&StreakRecord {
                current_streak: 15,
                last_completed_date: Some(day(18)),
                best_streak: 15,
            })
            .unwrap();

        let idx = forja_index(&store).unwrap();
        assert_eq!(idx, ForjaIndex { index: 50, avg_completion: 50, streak_bonus: 50 });
    }

    #[test]
    fn test_empty_days_count_as_perfect_and_bonus_caps() {
        let logs = vec![DailyLog::new(day(1), 0, 0), DailyLog::new(day(2), 3, 3)];
        let idx = compute_index(&logs, 45);
        assert_eq!(idx.avg_completion, 100);
        assert_eq!(idx.streak_bonus, 100);
        assert_eq!(idx.index, 100);
    }

    #[test]
    fn test_index_blends_rounded_parts() {
        // 1/7 is 14.29%, rounded to 14 before weighting: 14 * 0.6 = 8.4
        let store = MemoryStore::new();
        store.upsert_daily_log(&DailyLog::new(day(3), 1, 7)).unwrap();

        let idx = forja_index(&store).unwrap();
        assert_eq!(idx, ForjaIndex { index: 8, avg_completion: 14, streak_bonus: 0 });
    }

    #[test]
    fn test_only_last_fourteen_logs_count() {
        let store = MemoryStore::new();
        // 14 perfect recent days preceded by older failures
        for d in 1..=6 {
            store.upsert_daily_log(&DailyLog::new(day(d), 0, 4)).unwrap();
        }
        for d in 7..=20 {
            store.upsert_daily_log(&DailyLog::new(day(d), 4, 4)).unwrap();
        }
        let idx = forja_index(&store).unwrap();
        assert_eq!(idx.avg_completion, 100);
        assert_eq!(idx.index, 60);
    }
}
