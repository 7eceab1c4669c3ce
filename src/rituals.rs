use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ForjaError;
use crate::model::{hhmm, Category, NewRitual, Ritual};
use crate::state::app::AppState;

/// A ritual expanded for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RitualItem {
    /// `ritual_<id>`, distinct from task ids
    pub key: String,
    pub ritual_id: i64,
    pub title: String,
    pub category: Category,
    pub date: NaiveDate,
    #[serde(default, with = "hhmm")]
    pub due_time: Option<NaiveTime>,
    pub completed: bool,
    pub expired: bool,
}

/// Past its due time on `date` as seen at `now`
pub fn is_expired(ritual: &Ritual, date: NaiveDate, now: NaiveDateTime) -> bool {
    match ritual.due_time {
        Some(due) => now > date.and_time(due),
        None => false,
    }
}

pub fn ritual_item(ritual: &Ritual, date: NaiveDate, now: NaiveDateTime) -> RitualItem {
    let completed = ritual.last_completed_date == Some(date);
    RitualItem {
        key: format!("ritual_{}", ritual.id),
        ritual_id: ritual.id,
        title: ritual.title.clone(),
        category: ritual.category,
        date,
        due_time: ritual.due_time,
        completed,
        expired: !completed && is_expired(ritual, date, now),
    }
}

pub fn add_ritual(state: &AppState, ritual: NewRitual) -> Result<Ritual, ForjaError> {
    if ritual.title.trim().is_empty() {
        return Err(ForjaError::invalid_input("ritual title must not be empty", "rituals"));
    }
    let ritual = state.track(state.store().insert_ritual(&ritual).map_err(ForjaError::from))?;
    tracing::info!(id = ritual.id, title = %ritual.title, "Ritual added");
    Ok(ritual)
}

pub fn active_rituals(state: &AppState) -> Result<Vec<Ritual>, ForjaError> {
    state.track(state.store().list_active_rituals().map_err(ForjaError::from))
}

pub fn complete_ritual(state: &AppState, id: i64, date: NaiveDate) -> Result<(), ForjaError> {
    state.track(state.store().complete_ritual(id, date).map_err(ForjaError::from))?;
    tracing::info!(id = id, date = %date, "Ritual completed");
    Ok(())
}

pub fn daily_ritual_items(
    state: &AppState,
    date: NaiveDate,
    now: NaiveDateTime,
) -> Result<Vec<RitualItem>, ForjaError> {
    Ok(active_rituals(state)?
        .iter()
        .map(|r| ritual_item(r, date, now))
        .collect())
}
