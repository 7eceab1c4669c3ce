//! One entry point per user action. Inputs arrive as loosely typed values
//! from the CLI; errors leave as display strings.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::achievements::Achievement;
use crate::day::{CompletionStats, DayClosure};
use crate::engine::index::{forja_index, ForjaIndex};
use crate::engine::progression::{mascot_profile, MascotProfile};
use crate::engine::trend::{generate_weekly_report, WeeklyReport};
use crate::error::ForjaError;
use crate::model::{parse_date, parse_time, Category, CategoryProgress, DailyLog, NewRitual, NewTask, Ritual, Task, UserStats};
use crate::phrase::DailyPhrase;
use crate::recap::AnnualRecap;
use crate::rituals::RitualItem;
use crate::state::app::AppState;
use crate::tasks::CompletionChange;

fn date_or_today(date: Option<&str>) -> Result<NaiveDate, String> {
    match date {
        Some(s) => parse_date(s).map_err(|e| format!("Invalid date '{}': {}", s, e)),
        None => Ok(Local::now().date_naive()),
    }
}

fn optional_time(time: Option<&str>) -> Result<Option<chrono::NaiveTime>, String> {
    time.map(|s| parse_time(s).map_err(|e| format!("Invalid time '{}': {}", s, e)))
        .transpose()
}

fn to_message(e: ForjaError) -> String {
    e.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayOverview {
    pub date: NaiveDate,
    pub tasks: Vec<Task>,
    pub rituals: Vec<RitualItem>,
    pub stats: CompletionStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsOverview {
    pub stats: UserStats,
    pub categories: Vec<CategoryProgress>,
    pub completed_by_category: BTreeMap<Category, u32>,
}

pub fn add_task(
    state: &AppState,
    title: &str,
    category: &str,
    date: Option<&str>,
    due_time: Option<&str>,
) -> Result<Task, String> {
    let new = NewTask {
        title: title.trim().to_string(),
        category: Category::parse(category),
        date: date_or_today(date)?,
        due_time: optional_time(due_time)?,
    };
    let task = crate::tasks::add_task(state, new).map_err(to_message)?;
    crate::tasks::refresh_task_prompt(state, Local::now().date_naive()).map_err(to_message)?;
    Ok(task)
}

pub fn list_day(state: &AppState, date: Option<&str>) -> Result<DayOverview, String> {
    let date = date_or_today(date)?;
    let now = Local::now().naive_local();
    Ok(DayOverview {
        date,
        tasks: crate::tasks::tasks_for(state, date).map_err(to_message)?,
        rituals: crate::rituals::daily_ritual_items(state, date, now).map_err(to_message)?,
        stats: crate::day::completion_stats(state, date).map_err(to_message)?,
    })
}

pub fn complete_task(state: &AppState, id: i64) -> Result<CompletionChange, String> {
    crate::tasks::set_completion(state, id, true).map_err(to_message)
}

pub fn reopen_task(state: &AppState, id: i64) -> Result<CompletionChange, String> {
    crate::tasks::set_completion(state, id, false).map_err(to_message)
}

pub fn toggle_task(state: &AppState, id: i64) -> Result<CompletionChange, String> {
    crate::tasks::toggle_task(state, id).map_err(to_message)
}

pub fn delete_task(state: &AppState, id: i64) -> Result<(), String> {
    match crate::tasks::delete_task(state, id).map_err(to_message)? {
        true => Ok(()),
        false => Err(format!("Task {} not found", id)),
    }
}

pub fn close_day(
    state: &AppState,
    date: Option<&str>,
    reflection: Option<String>,
) -> Result<DayClosure, String> {
    let date = date_or_today(date)?;
    crate::day::close_day(state, date, reflection).map_err(to_message)
}

pub fn get_history(state: &AppState, limit: usize) -> Result<Vec<DailyLog>, String> {
    crate::day::history(state, limit).map_err(to_message)
}

pub fn get_pending_closure(state: &AppState) -> Result<Option<NaiveDate>, String> {
    crate::day::pending_closure(state, Local::now().date_naive()).map_err(to_message)
}

pub fn get_forja_index(state: &AppState) -> Result<ForjaIndex, String> {
    forja_index(state.store()).map_err(to_message)
}

pub fn get_weekly_report(state: &AppState, date: Option<&str>) -> Result<WeeklyReport, String> {
    let reference = date_or_today(date)?;
    generate_weekly_report(state.store(), reference, &state.lexicon).map_err(to_message)
}

pub fn get_mascot(state: &AppState) -> Result<MascotProfile, String> {
    mascot_profile(state.store()).map_err(to_message)
}

pub fn get_stats(state: &AppState) -> Result<StatsOverview, String> {
    let store = state.store();
    Ok(StatsOverview {
        stats: store.get_user_stats().map_err(|e| to_message(e.into()))?,
        categories: store.get_category_progress().map_err(|e| to_message(e.into()))?,
        completed_by_category: crate::day::category_completion(state).map_err(to_message)?,
    })
}

pub fn get_achievements(state: &AppState) -> Result<Vec<Achievement>, String> {
    crate::achievements::achievements(state).map_err(to_message)
}

pub fn get_annual_recap(state: &AppState, year: Option<i32>) -> Result<AnnualRecap, String> {
    let year = year.unwrap_or_else(|| chrono::Datelike::year(&Local::now().date_naive()));
    crate::recap::annual_recap(state, year).map_err(to_message)
}

pub fn add_ritual(
    state: &AppState,
    title: &str,
    category: &str,
    due_time: Option<&str>,
) -> Result<Ritual, String> {
    let ritual = NewRitual {
        title: title.trim().to_string(),
        category: Category::parse(category),
        due_time: optional_time(due_time)?,
    };
    crate::rituals::add_ritual(state, ritual).map_err(to_message)
}

pub fn complete_ritual(state: &AppState, id: i64, date: Option<&str>) -> Result<(), String> {
    let date = date_or_today(date)?;
    crate::rituals::complete_ritual(state, id, date).map_err(to_message)
}

pub fn get_rituals(state: &AppState, date: Option<&str>) -> Result<Vec<RitualItem>, String> {
    let date = date_or_today(date)?;
    crate::rituals::daily_ritual_items(state, date, Local::now().naive_local()).map_err(to_message)
}

pub async fn get_daily_phrase(state: &AppState) -> Result<Option<DailyPhrase>, String> {
    Ok(crate::phrase::daily_phrase(state, Local::now().date_naive()).await)
}
