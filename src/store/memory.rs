use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use parking_lot::RwLock;

use crate::model::{
    Category, CategoryProgress, DailyLog, NewRitual, NewTask, Ritual, StreakRecord, Task, UserStats,
};
use crate::store::{validate_log, validate_task, Store, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    tasks: Vec<Task>,
    logs: BTreeMap<NaiveDate, DailyLog>,
    streak: StreakRecord,
    stats: UserStats,
    categories: Vec<CategoryProgress>,
    rituals: Vec<Ritual>,
    next_task_id: i64,
    next_log_id: i64,
    next_ritual_id: i64,
}

/// In-process store with the same observable behaviour as `SqliteStore`.
/// Nothing survives the process; used by tests and dry runs.
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let tables = Tables {
            categories: Category::ALL.iter().copied().map(CategoryProgress::seed).collect(),
            next_task_id: 1,
            next_log_id: 1,
            next_ritual_id: 1,
            ..Tables::default()
        };
        MemoryStore {
            tables: RwLock::new(tables),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn insert_task(&self, task: &NewTask) -> StoreResult<Task> {
        validate_task(task)?;
        let mut t = self.tables.write();
        let stored = Task {
            id: t.next_task_id,
            title: task.title.clone(),
            completed: false,
            category: task.category,
            date: task.date,
            due_time: task.due_time,
        };
        t.next_task_id += 1;
        t.tasks.push(stored.clone());
        Ok(stored)
    }

    fn get_task(&self, id: i64) -> StoreResult<Option<Task>> {
        Ok(self.tables.read().tasks.iter().find(|t| t.id == id).cloned())
    }

    fn list_tasks_by_date(&self, date: NaiveDate) -> StoreResult<Vec<Task>> {
        // ids are handed out in increasing order, so insertion order is id order
        Ok(self
            .tables
            .read()
            .tasks
            .iter()
            .filter(|t| t.date == date)
            .cloned()
            .collect())
    }

    fn update_task_completion(&self, id: i64, completed: bool) -> StoreResult<()> {
        let mut t = self.tables.write();
        let task = t
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "task",
                id: id.to_string(),
            })?;
        task.completed = completed;
        Ok(())
    }

    fn delete_task(&self, id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write();
        let before = t.tasks.len();
        t.tasks.retain(|task| task.id != id);
        Ok(t.tasks.len() != before)
    }

    fn completed_counts_by_category(&self) -> StoreResult<BTreeMap<Category, u32>> {
        let mut counts = BTreeMap::new();
        for task in self.tables.read().tasks.iter().filter(|t| t.completed) {
            *counts.entry(task.category).or_insert(0) += 1;
        }
        Ok(counts)
    }

    fn count_completed_tasks_in_year(&self, year: i32) -> StoreResult<u32> {
        let count = self
            .tables
            .read()
            .tasks
            .iter()
            .filter(|t| t.completed && t.date.year() == year)
            .count();
        Ok(count as u32)
    }

    fn pending_closure_date(&self, before: NaiveDate) -> StoreResult<Option<NaiveDate>> {
        let t = self.tables.read();
        Ok(t.tasks
            .iter()
            .map(|task| task.date)
            .filter(|d| *d < before && !t.logs.contains_key(d))
            .min())
    }

    fn upsert_daily_log(&self, log: &DailyLog) -> StoreResult<DailyLog> {
        validate_log(log)?;
        let mut t = self.tables.write();
        let existing_id = t.logs.get(&log.date).and_then(|existing| existing.id);
        let id = match existing_id {
            Some(id) => id,
            None => {
                let id = t.next_log_id;
                t.next_log_id += 1;
                id
            }
        };
        let stored = DailyLog {
            id: Some(id),
            ..log.clone()
        };
        t.logs.insert(log.date, stored.clone());
        Ok(stored)
    }

    fn list_recent_logs(&self, limit: usize) -> StoreResult<Vec<DailyLog>> {
        Ok(self
            .tables
            .read()
            .logs
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    fn list_logs_until(&self, date: NaiveDate, limit: usize) -> StoreResult<Vec<DailyLog>> {
        Ok(self
            .tables
            .read()
            .logs
            .range(..=date)
            .rev()
            .take(limit)
            .map(|(_, log)| log.clone())
            .collect())
    }

    fn list_all_logs(&self) -> StoreResult<Vec<DailyLog>> {
        Ok(self.tables.read().logs.values().cloned().collect())
    }

    fn list_logs_for_year(&self, year: i32) -> StoreResult<Vec<DailyLog>> {
        Ok(self
            .tables
            .read()
            .logs
            .values()
            .filter(|l| l.date.year() == year)
            .cloned()
            .collect())
    }

    fn get_streak_record(&self) -> StoreResult<StreakRecord> {
        Ok(self.tables.read().streak.clone())
    }

    fn set_streak_record(&self, record: &StreakRecord) -> StoreResult<()> {
        self.tables.write().streak = record.clone();
        Ok(())
    }

    fn get_user_stats(&self) -> StoreResult<UserStats> {
        Ok(self.tables.read().stats.clone())
    }

    fn set_user_stats(&self, stats: &UserStats) -> StoreResult<()> {
        self.tables.write().stats = stats.clone();
        Ok(())
    }

    fn get_category_progress(&self) -> StoreResult<Vec<CategoryProgress>> {
        Ok(self.tables.read().categories.clone())
    }

    fn set_category_progress(&self, name: Category, exp: u32, level: u32) -> StoreResult<()> {
        let mut t = self.tables.write();
        match t.categories.iter().position(|c| c.name == name) {
            Some(i) => {
                t.categories[i].exp = exp;
                t.categories[i].level = level;
            }
            None => t.categories.push(CategoryProgress {
                exp,
                level,
                ..CategoryProgress::seed(name)
            }),
        }
        Ok(())
    }

    fn insert_ritual(&self, ritual: &NewRitual) -> StoreResult<Ritual> {
        if ritual.title.trim().is_empty() {
            return Err(StoreError::Invalid("ritual title must not be empty".into()));
        }
        let mut t = self.tables.write();
        let stored = Ritual {
            id: t.next_ritual_id,
            title: ritual.title.clone(),
            category: ritual.category,
            due_time: ritual.due_time,
            active: true,
            last_completed_date: None,
        };
        t.next_ritual_id += 1;
        t.rituals.push(stored.clone());
        Ok(stored)
    }

    fn list_active_rituals(&self) -> StoreResult<Vec<Ritual>> {
        Ok(self
            .tables
            .read()
            .rituals
            .iter()
            .filter(|r| r.active)
            .cloned()
            .collect())
    }

    fn complete_ritual(&self, id: i64, date: NaiveDate) -> StoreResult<()> {
        let mut t = self.tables.write();
        let ritual = t
            .rituals
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "ritual",
                id: id.to_string(),
            })?;
        ritual.last_completed_date = Some(date);
        Ok(())
    }
}
