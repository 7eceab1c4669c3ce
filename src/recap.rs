use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::engine::percent;
use crate::engine::progression::MascotStage;
use crate::error::ForjaError;
use crate::model::DailyLog;
use crate::state::app::AppState;

const MONTH_NAMES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

/// Shown as the best month when no month had any completion
pub const NO_MONTH: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnualRecap {
    pub year: i32,
    pub total_tasks_completed: u32,
    pub golden_month: String,
    /// Completion rate of the golden month, percent
    pub golden_month_rate: u32,
    pub perfect_days: u32,
    pub mascot_stage: MascotStage,
}

/// Month (1-12) with the highest completed/total ratio and that ratio.
/// Ties keep the earlier month; months with no completions never win.
pub fn best_month(logs: &[DailyLog]) -> Option<(u32, f64)> {
    let mut months: BTreeMap<u32, (u32, u32)> = BTreeMap::new();
    for log in logs {
        let entry = months.entry(log.date.month()).or_insert((0, 0));
        entry.0 += log.completed_count;
        entry.1 += log.total_count;
    }

    let mut best: Option<(u32, f64)> = None;
    for (month, (completed, total)) in months {
        let rate = if total > 0 {
            completed as f64 / total as f64
        } else {
            0.0
        };
        if rate > best.map(|(_, r)| r).unwrap_or(0.0) {
            best = Some((month, rate));
        }
    }
    best
}

pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
        .unwrap_or(NO_MONTH)
}

pub fn annual_recap(state: &AppState, year: i32) -> Result<AnnualRecap, ForjaError> {
    let store = state.store();
    let total_tasks_completed = state.track(
        store
            .count_completed_tasks_in_year(year)
            .map_err(ForjaError::from),
    )?;
    let logs = state.track(store.list_logs_for_year(year).map_err(ForjaError::from))?;
    let total_exp = state.track(store.get_user_stats().map_err(ForjaError::from))?.total_exp;

    let perfect_days = logs.iter().filter(|log| log.is_perfect()).count() as u32;
    let (golden_month, golden_month_rate) = match best_month(&logs) {
        Some((month, rate)) => (month_name(month).to_string(), percent(rate * 100.0)),
        None => (NO_MONTH.to_string(), 0),
    };

    tracing::info!(
        year = year,
        completed = total_tasks_completed,
        perfect_days = perfect_days,
        golden_month = %golden_month,
        "Annual recap built"
    );

    Ok(AnnualRecap {
        year,
        total_tasks_completed,
        golden_month,
        golden_month_rate,
        perfect_days,
        mascot_stage: MascotStage::from_total_exp(total_exp),
    })
}
