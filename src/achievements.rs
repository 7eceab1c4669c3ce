use serde::{Deserialize, Serialize};

use crate::error::ForjaError;
use crate::state::app::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Condition {
    StreakAtLeast(u32),
    LastDayPerfect,
    CategoriesCompleted(usize),
}

struct Definition {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    icon: &'static str,
    condition: Condition,
}

const DEFINITIONS: [Definition; 5] = [
    Definition {
        id: "initiation",
        title: "Iniciación",
        description: "Alcanza una racha de 3 días.",
        icon: "🔥",
        condition: Condition::StreakAtLeast(3),
    },
    Definition {
        id: "constancy",
        title: "Constancia",
        description: "Mantén una racha de 7 días.",
        icon: "🛡️",
        condition: Condition::StreakAtLeast(7),
    },
    Definition {
        id: "perfectionist",
        title: "Perfeccionista",
        description: "Cierra un día con el 100% de cumplimiento.",
        icon: "💎",
        condition: Condition::LastDayPerfect,
    },
    Definition {
        id: "mastery",
        title: "Maestría",
        description: "Alcanza una racha de 15 días.",
        icon: "🦁",
        condition: Condition::StreakAtLeast(15),
    },
    Definition {
        id: "explorer",
        title: "Explorador",
        description: "Completa al menos una tarea en cada categoría.",
        icon: "🗺️",
        // four of five: Otros is not required
        condition: Condition::CategoriesCompleted(4),
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub unlocked: bool,
}

/// Inputs every condition is checked against, read once per evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AchievementFacts {
    pub current_streak: u32,
    pub last_day_perfect: bool,
    pub categories_completed: usize,
}

impl AchievementFacts {
    pub fn load(state: &AppState) -> Result<Self, ForjaError> {
        let store = state.store();
        let current_streak = store.get_streak_record()?.current_streak;
        let last_day_perfect = store
            .list_recent_logs(1)?
            .first()
            .map(|log| log.is_perfect())
            .unwrap_or(false);
        let categories_completed = store
            .completed_counts_by_category()?
            .values()
            .filter(|count| **count > 0)
            .count();

        Ok(AchievementFacts {
            current_streak,
            last_day_perfect,
            categories_completed,
        })
    }
}

fn holds(condition: Condition, facts: &AchievementFacts) -> bool {
    match condition {
        Condition::StreakAtLeast(days) => facts.current_streak >= days,
        Condition::LastDayPerfect => facts.last_day_perfect,
        Condition::CategoriesCompleted(n) => facts.categories_completed >= n,
    }
}

/// Every achievement with its unlock state for the given facts.
/// Unlocks are not persisted, so breaking a streak locks them again.
pub fn evaluate(facts: &AchievementFacts) -> Vec<Achievement> {
    DEFINITIONS
        .iter()
        .map(|def| Achievement {
            id: def.id.to_string(),
            title: def.title.to_string(),
            description: def.description.to_string(),
            icon: def.icon.to_string(),
            unlocked: holds(def.condition, facts),
        })
        .collect()
}

pub fn achievements(state: &AppState) -> Result<Vec<Achievement>, ForjaError> {
    let facts = state.track(AchievementFacts::load(state))?;
    let list = evaluate(&facts);
    tracing::debug!(
        unlocked = list.iter().filter(|a| a.unlocked).count(),
        "Achievements evaluated"
    );
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unlocked(facts: &AchievementFacts) -> Vec<String> {
        evaluate(facts)
            .into_iter()
            .filter(|a| a.unlocked)
            .map(|a| a.id)
            .collect()
    }

    #[test]
    fn test_nothing_unlocked_on_fresh_state() {
        let state = AppState::in_memory();
        let list = achievements(&state).unwrap();
        assert_eq!(list.len(), 5);
        assert!(list.iter().all(|a| !a.unlocked));
    }

    #[test]
    fn test_streak_tiers() {
        let facts = AchievementFacts {
            current_streak: 7,
            ..Default::default()
        };
        assert_eq!(unlocked(&facts), vec!["initiation", "constancy"]);

        let facts = AchievementFacts {
            current_streak: 15,
            ..Default::default()
        };
        assert_eq!(unlocked(&facts), vec!["initiation", "constancy", "mastery"]);
    }

    #[test]
    fn test_explorer_needs_four_categories() {
        let mut facts = AchievementFacts {
            categories_completed: 3,
            ..Default::default()
        };
        assert!(unlocked(&facts).is_empty());
        facts.categories_completed = 4;
        assert_eq!(unlocked(&facts), vec!["explorer"]);
    }

    #[test]
    fn test_perfect_last_day() {
        use crate::model::DailyLog;
        use chrono::NaiveDate;

        let state = AppState::in_memory();
        let date = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        state.store().upsert_daily_log(&DailyLog::new(date, 0, 0)).unwrap();
        assert!(!AchievementFacts::load(&state).unwrap().last_day_perfect);

        state.store().upsert_daily_log(&DailyLog::new(date, 2, 2)).unwrap();
        let list = achievements(&state).unwrap();
        let perfect = list.iter().find(|a| a.id == "perfectionist").unwrap();
        assert!(perfect.unlocked);
    }
}
