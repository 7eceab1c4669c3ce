//! Persistence boundary. Engines and services only talk to `dyn Store`;
//! the singleton rows (streak, user stats) are typed accessors here rather
//! than one-row tables leaking into callers.

pub mod memory;
pub mod sqlite;

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::model::{
    Category, CategoryProgress, DailyLog, NewRitual, NewTask, Ritual, StreakRecord, Task, UserStats,
};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("invalid record: {0}")]
    Invalid(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable CRUD over the tracker's records.
///
/// Implementations are used from one logical caller at a time; no
/// multi-call transactions are offered.
pub trait Store: Send + Sync {
    fn insert_task(&self, task: &NewTask) -> StoreResult<Task>;
    fn get_task(&self, id: i64) -> StoreResult<Option<Task>>;
    /// Tasks of one date, ordered by id
    fn list_tasks_by_date(&self, date: NaiveDate) -> StoreResult<Vec<Task>>;
    /// Fails with `NotFound` for unknown ids
    fn update_task_completion(&self, id: i64, completed: bool) -> StoreResult<()>;
    /// Returns whether a row was removed
    fn delete_task(&self, id: i64) -> StoreResult<bool>;
    fn completed_counts_by_category(&self) -> StoreResult<BTreeMap<Category, u32>>;
    fn count_completed_tasks_in_year(&self, year: i32) -> StoreResult<u32>;
    /// Earliest task date before `before` that has no daily log
    fn pending_closure_date(&self, before: NaiveDate) -> StoreResult<Option<NaiveDate>>;

    /// Insert or overwrite the log of `log.date`; returns the stored row
    fn upsert_daily_log(&self, log: &DailyLog) -> StoreResult<DailyLog>;
    /// Most recent logs first
    fn list_recent_logs(&self, limit: usize) -> StoreResult<Vec<DailyLog>>;
    /// At most `limit` logs dated on or before `date`, most recent first
    fn list_logs_until(&self, date: NaiveDate, limit: usize) -> StoreResult<Vec<DailyLog>>;
    /// Every log, oldest first
    fn list_all_logs(&self) -> StoreResult<Vec<DailyLog>>;
    /// Logs of one calendar year, oldest first
    fn list_logs_for_year(&self, year: i32) -> StoreResult<Vec<DailyLog>>;

    fn get_streak_record(&self) -> StoreResult<StreakRecord>;
    fn set_streak_record(&self, record: &StreakRecord) -> StoreResult<()>;
    fn get_user_stats(&self) -> StoreResult<UserStats>;
    fn set_user_stats(&self, stats: &UserStats) -> StoreResult<()>;
    fn get_category_progress(&self) -> StoreResult<Vec<CategoryProgress>>;
    fn set_category_progress(&self, name: Category, exp: u32, level: u32) -> StoreResult<()>;

    fn insert_ritual(&self, ritual: &NewRitual) -> StoreResult<Ritual>;
    fn list_active_rituals(&self) -> StoreResult<Vec<Ritual>>;
    fn complete_ritual(&self, id: i64, date: NaiveDate) -> StoreResult<()>;
}

/// Shared write-side checks for every implementation.
pub(crate) fn validate_log(log: &DailyLog) -> StoreResult<()> {
    if log.completed_count > log.total_count {
        return Err(StoreError::Invalid(format!(
            "daily log {}: completed_count {} exceeds total_count {}",
            log.date, log.completed_count, log.total_count
        )));
    }
    Ok(())
}

pub(crate) fn validate_task(task: &NewTask) -> StoreResult<()> {
    if task.title.trim().is_empty() {
        return Err(StoreError::Invalid("task title must not be empty".into()));
    }
    Ok(())
}
