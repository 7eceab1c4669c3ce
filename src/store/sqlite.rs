use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::model::{
    format_time, parse_time, Category, CategoryProgress, DailyLog, NewRitual, NewTask, Ritual,
    StreakRecord, Task, UserStats,
};
use crate::store::{validate_log, validate_task, Store, StoreError, StoreResult};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        completed INTEGER NOT NULL DEFAULT 0,
        category TEXT,
        date TEXT NOT NULL,
        due_time TEXT
    );

    CREATE TABLE IF NOT EXISTS daily_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT UNIQUE NOT NULL,
        completed_count INTEGER NOT NULL DEFAULT 0,
        total_count INTEGER NOT NULL DEFAULT 0,
        reflection TEXT
    );

    CREATE TABLE IF NOT EXISTS streak (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        current_streak INTEGER NOT NULL DEFAULT 0,
        last_completed_date TEXT,
        best_streak INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS user_stats (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        strength INTEGER NOT NULL DEFAULT 0,
        discipline INTEGER NOT NULL DEFAULT 0,
        wisdom INTEGER NOT NULL DEFAULT 0,
        total_exp INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS category_progress (
        name TEXT PRIMARY KEY,
        exp INTEGER NOT NULL DEFAULT 0,
        level INTEGER NOT NULL DEFAULT 1,
        color TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS rituals (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        category TEXT,
        due_time TEXT,
        active INTEGER NOT NULL DEFAULT 1,
        last_completed_date TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_tasks_date ON tasks(date);

    INSERT OR IGNORE INTO streak (id, current_streak, best_streak) VALUES (1, 0, 0);
    INSERT OR IGNORE INTO user_stats (id) VALUES (1);
";

/// Columns added after the first schema shipped: (table, column, definition)
const MIGRATIONS: &[(&str, &str, &str)] = &[
    ("daily_logs", "reflection", "TEXT"),
    ("tasks", "due_time", "TEXT"),
];

/// SQLite-backed store. One connection, opened once per process.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file, creating parent directories as needed
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Unavailable(format!("cannot create {:?}: {}", parent, e))
                })?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self::from_connection(conn)?;
        tracing::info!(path = ?path, "Database opened");
        Ok(store)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        apply_migrations(&conn)?;
        for category in Category::ALL {
            conn.execute(
                "INSERT OR IGNORE INTO category_progress (name, exp, level, color) VALUES (?1, 0, 1, ?2)",
                params![category.as_str(), category.color()],
            )?;
        }
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }
}

fn apply_migrations(conn: &Connection) -> StoreResult<()> {
    for (table, column, definition) in MIGRATIONS {
        if !column_exists(conn, table, column)? {
            conn.execute_batch(&format!(
                "ALTER TABLE {} ADD COLUMN {} {};",
                table, column, definition
            ))?;
            tracing::info!(table = table, column = column, "Applied migration");
        }
    }
    Ok(())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|n| n == column))
}

fn time_from_column(raw: Option<String>) -> StoreResult<Option<chrono::NaiveTime>> {
    match raw {
        Some(s) if !s.is_empty() => parse_time(&s)
            .map(Some)
            .map_err(|e| StoreError::Corrupt(format!("bad time {:?}: {}", s, e))),
        _ => Ok(None),
    }
}

struct TaskRow {
    id: i64,
    title: String,
    completed: bool,
    category: Option<String>,
    date: NaiveDate,
    due_time: Option<String>,
}

impl TaskRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(TaskRow {
            id: row.get("id")?,
            title: row.get("title")?,
            completed: row.get("completed")?,
            category: row.get("category")?,
            date: row.get("date")?,
            due_time: row.get("due_time")?,
        })
    }

    fn into_task(self) -> StoreResult<Task> {
        Ok(Task {
            id: self.id,
            title: self.title,
            completed: self.completed,
            category: self
                .category
                .as_deref()
                .map(Category::parse)
                .unwrap_or(Category::Otros),
            date: self.date,
            due_time: time_from_column(self.due_time)?,
        })
    }
}

fn log_from_row(row: &Row) -> rusqlite::Result<DailyLog> {
    Ok(DailyLog {
        id: row.get("id")?,
        date: row.get("date")?,
        completed_count: row.get("completed_count")?,
        total_count: row.get("total_count")?,
        reflection: row.get("reflection")?,
    })
}

fn collect_logs(conn: &Connection, sql: &str, args: impl rusqlite::Params) -> StoreResult<Vec<DailyLog>> {
    let mut stmt = conn.prepare(sql)?;
    let logs = stmt
        .query_map(args, log_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(logs)
}

fn year_pattern(year: i32) -> String {
    format!("{:04}-%", year)
}

impl Store for SqliteStore {
    fn insert_task(&self, task: &NewTask) -> StoreResult<Task> {
        validate_task(task)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO tasks (title, completed, category, date, due_time) VALUES (?1, 0, ?2, ?3, ?4)",
            params![
                task.title,
                task.category.as_str(),
                task.date,
                task.due_time.as_ref().map(format_time),
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(task_id = id, date = %task.date, "Inserted task");
        Ok(Task {
            id,
            title: task.title.clone(),
            completed: false,
            category: task.category,
            date: task.date,
            due_time: task.due_time,
        })
    }

    fn get_task(&self, id: i64) -> StoreResult<Option<Task>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row("SELECT * FROM tasks WHERE id = ?1", params![id], TaskRow::from_row)
            .optional()?;
        row.map(TaskRow::into_task).transpose()
    }

    fn list_tasks_by_date(&self, date: NaiveDate) -> StoreResult<Vec<Task>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM tasks WHERE date = ?1 ORDER BY id ASC")?;
        let rows = stmt
            .query_map(params![date], TaskRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(TaskRow::into_task).collect()
    }

    fn update_task_completion(&self, id: i64, completed: bool) -> StoreResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE tasks SET completed = ?1 WHERE id = ?2",
            params![completed, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "task",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn delete_task(&self, id: i64) -> StoreResult<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn completed_counts_by_category(&self) -> StoreResult<BTreeMap<Category, u32>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*) FROM tasks WHERE completed = 1 GROUP BY category",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, Option<String>>(0)?, row.get::<_, u32>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut counts = BTreeMap::new();
        for (name, count) in rows {
            let category = name.as_deref().map(Category::parse).unwrap_or(Category::Otros);
            *counts.entry(category).or_insert(0) += count;
        }
        Ok(counts)
    }

    fn count_completed_tasks_in_year(&self, year: i32) -> StoreResult<u32> {
        let conn = self.conn.lock();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE completed = 1 AND date LIKE ?1",
            params![year_pattern(year)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn pending_closure_date(&self, before: NaiveDate) -> StoreResult<Option<NaiveDate>> {
        let conn = self.conn.lock();
        let date = conn
            .query_row(
                "SELECT DISTINCT date FROM tasks
                 WHERE date < ?1 AND date NOT IN (SELECT date FROM daily_logs)
                 ORDER BY date ASC LIMIT 1",
                params![before],
                |row| row.get(0),
            )
            .optional()?;
        Ok(date)
    }

    fn upsert_daily_log(&self, log: &DailyLog) -> StoreResult<DailyLog> {
        validate_log(log)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO daily_logs (date, completed_count, total_count, reflection)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(date) DO UPDATE SET
                completed_count = excluded.completed_count,
                total_count = excluded.total_count,
                reflection = excluded.reflection",
            params![log.date, log.completed_count, log.total_count, log.reflection],
        )?;
        let stored = conn.query_row(
            "SELECT * FROM daily_logs WHERE date = ?1",
            params![log.date],
            log_from_row,
        )?;
        Ok(stored)
    }

    fn list_recent_logs(&self, limit: usize) -> StoreResult<Vec<DailyLog>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self.conn.lock();
        collect_logs(
            &conn,
            "SELECT * FROM daily_logs ORDER BY date DESC LIMIT ?1",
            params![limit],
        )
    }

    fn list_logs_until(&self, date: NaiveDate, limit: usize) -> StoreResult<Vec<DailyLog>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self.conn.lock();
        collect_logs(
            &conn,
            "SELECT * FROM daily_logs WHERE date <= ?1 ORDER BY date DESC LIMIT ?2",
            params![date, limit],
        )
    }

    fn list_all_logs(&self) -> StoreResult<Vec<DailyLog>> {
        let conn = self.conn.lock();
        collect_logs(&conn, "SELECT * FROM daily_logs ORDER BY date ASC", [])
    }

    fn list_logs_for_year(&self, year: i32) -> StoreResult<Vec<DailyLog>> {
        let conn = self.conn.lock();
        collect_logs(
            &conn,
            "SELECT * FROM daily_logs WHERE date LIKE ?1 ORDER BY date ASC",
            params![year_pattern(year)],
        )
    }

    fn get_streak_record(&self) -> StoreResult<StreakRecord> {
        let conn = self.conn.lock();
        let record = conn.query_row(
            "SELECT current_streak, last_completed_date, best_streak FROM streak WHERE id = 1",
            [],
            |row| {
                Ok(StreakRecord {
                    current_streak: row.get(0)?,
                    last_completed_date: row.get(1)?,
                    best_streak: row.get(2)?,
                })
            },
        )?;
        Ok(record)
    }

    fn set_streak_record(&self, record: &StreakRecord) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE streak SET current_streak = ?1, last_completed_date = ?2, best_streak = ?3 WHERE id = 1",
            params![
                record.current_streak,
                record.last_completed_date,
                record.best_streak
            ],
        )?;
        Ok(())
    }

    fn get_user_stats(&self) -> StoreResult<UserStats> {
        let conn = self.conn.lock();
        let stats = conn.query_row(
            "SELECT strength, discipline, wisdom, total_exp FROM user_stats WHERE id = 1",
            [],
            |row| {
                Ok(UserStats {
                    strength: row.get(0)?,
                    discipline: row.get(1)?,
                    wisdom: row.get(2)?,
                    total_exp: row.get(3)?,
                })
            },
        )?;
        Ok(stats)
    }

    fn set_user_stats(&self, stats: &UserStats) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE user_stats SET strength = ?1, discipline = ?2, wisdom = ?3, total_exp = ?4 WHERE id = 1",
            params![stats.strength, stats.discipline, stats.wisdom, stats.total_exp],
        )?;
        Ok(())
    }

    fn get_category_progress(&self) -> StoreResult<Vec<CategoryProgress>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT name, exp, level, color FROM category_progress ORDER BY rowid ASC")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CategoryProgress {
                    name: Category::parse(&row.get::<_, String>(0)?),
                    exp: row.get(1)?,
                    level: row.get(2)?,
                    color: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn set_category_progress(&self, name: Category, exp: u32, level: u32) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO category_progress (name, exp, level, color) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO UPDATE SET exp = excluded.exp, level = excluded.level",
            params![name.as_str(), exp, level, name.color()],
        )?;
        Ok(())
    }

    fn insert_ritual(&self, ritual: &NewRitual) -> StoreResult<Ritual> {
        if ritual.title.trim().is_empty() {
            return Err(StoreError::Invalid("ritual title must not be empty".into()));
        }
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO rituals (title, category, due_time, active) VALUES (?1, ?2, ?3, 1)",
            params![
                ritual.title,
                ritual.category.as_str(),
                ritual.due_time.as_ref().map(format_time),
            ],
        )?;
        Ok(Ritual {
            id: conn.last_insert_rowid(),
            title: ritual.title.clone(),
            category: ritual.category,
            due_time: ritual.due_time,
            active: true,
            last_completed_date: None,
        })
    }

    fn list_active_rituals(&self) -> StoreResult<Vec<Ritual>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, title, category, due_time, active, last_completed_date
             FROM rituals WHERE active = 1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, bool>(4)?,
                    row.get::<_, Option<NaiveDate>>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, title, category, due_time, active, last_completed_date)| {
                Ok(Ritual {
                    id,
                    title,
                    category: category.as_deref().map(Category::parse).unwrap_or(Category::Otros),
                    due_time: time_from_column(due_time)?,
                    active,
                    last_completed_date,
                })
            })
            .collect()
    }

    fn complete_ritual(&self, id: i64, date: NaiveDate) -> StoreResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE rituals SET last_completed_date = ?1 WHERE id = ?2",
            params![date, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "ritual",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
