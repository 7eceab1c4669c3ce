use serde::{Deserialize, Serialize};

use crate::engine::index::forja_index;
use crate::error::ForjaError;
use crate::model::{Category, UserStats};
use crate::store::Store;

pub const DEFAULT_GAIN: u32 = 10;
pub const DEFAULT_LOSS: u32 = 5;

/// Category level: 0..99 exp is level 1, 400 exp is level 3, 900 exp level 4.
pub fn level_for_exp(exp: u32) -> u32 {
    ((exp as f64 / 100.0).sqrt().floor() as u32) + 1
}

/// Attribute bucket a category feeds, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Strength,
    Discipline,
    Wisdom,
    Unbucketed,
}

fn bucket_for(category: Category) -> Bucket {
    match category {
        Category::Salud => Bucket::Strength,
        Category::Trabajo | Category::Personal => Bucket::Discipline,
        Category::Estudio => Bucket::Wisdom,
        Category::Otros => Bucket::Unbucketed,
    }
}

/// Stats after a gain. Unbucketed categories add half the amount to
/// `total_exp` on top of the flat `amount` every category adds.
pub fn apply_gain(stats: &UserStats, category: Category, amount: u32) -> UserStats {
    let mut next = stats.clone();
    match bucket_for(category) {
        Bucket::Strength => next.strength = next.strength.saturating_add(amount),
        Bucket::Discipline => next.discipline = next.discipline.saturating_add(amount),
        Bucket::Wisdom => next.wisdom = next.wisdom.saturating_add(amount),
        Bucket::Unbucketed => next.total_exp = next.total_exp.saturating_add(amount / 2),
    }
    next.total_exp = next.total_exp.saturating_add(amount);
    next
}

/// Mirror of `apply_gain`, clamping every field at zero.
pub fn apply_loss(stats: &UserStats, category: Category, amount: u32) -> UserStats {
    let mut next = stats.clone();
    match bucket_for(category) {
        Bucket::Strength => next.strength = next.strength.saturating_sub(amount),
        Bucket::Discipline => next.discipline = next.discipline.saturating_sub(amount),
        Bucket::Wisdom => next.wisdom = next.wisdom.saturating_sub(amount),
        Bucket::Unbucketed => next.total_exp = next.total_exp.saturating_sub(amount / 2),
    }
    next.total_exp = next.total_exp.saturating_sub(amount);
    next
}

fn category_exp(store: &dyn Store, category: Category) -> Result<u32, ForjaError> {
    Ok(store
        .get_category_progress()?
        .into_iter()
        .find(|row| row.name == category)
        .map(|row| row.exp)
        .unwrap_or(0))
}

/// Grant experience for a completed task.
///
/// Not idempotent: every call applies the delta again, so callers must
/// invoke it once per completion transition.
pub fn add_experience(store: &dyn Store, category: Category, amount: u32) -> Result<UserStats, ForjaError> {
    let stats = apply_gain(&store.get_user_stats()?, category, amount);
    store.set_user_stats(&stats)?;

    let exp = category_exp(store, category)?.saturating_add(amount);
    store.set_category_progress(category, exp, level_for_exp(exp))?;

    tracing::info!(
        category = %category,
        amount = amount,
        total_exp = stats.total_exp,
        category_exp = exp,
        "Experience added"
    );
    Ok(stats)
}

/// Remove experience for a task that was un-completed.
pub fn subtract_experience(store: &dyn Store, category: Category, amount: u32) -> Result<UserStats, ForjaError> {
    let stats = apply_loss(&store.get_user_stats()?, category, amount);
    store.set_user_stats(&stats)?;

    let exp = category_exp(store, category)?.saturating_sub(amount);
    store.set_category_progress(category, exp, level_for_exp(exp))?;

    tracing::info!(
        category = %category,
        amount = amount,
        total_exp = stats.total_exp,
        category_exp = exp,
        "Experience subtracted"
    );
    Ok(stats)
}

/// Mascot growth stage, derived from total experience
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MascotStage {
    #[serde(rename = "Cría")]
    Cria,
    Cazador,
    Dominante,
    Apex,
}

impl MascotStage {
    pub fn from_total_exp(total_exp: u32) -> Self {
        match total_exp {
            0..=149 => MascotStage::Cria,
            150..=499 => MascotStage::Cazador,
            500..=999 => MascotStage::Dominante,
            _ => MascotStage::Apex,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MascotStage::Cria => "Cría",
            MascotStage::Cazador => "Cazador",
            MascotStage::Dominante => "Dominante",
            MascotStage::Apex => "Apex",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            MascotStage::Cria => "Un pequeño lagarto que apenas comienza su camino.",
            MascotStage::Cazador => "Ágil y decidido, buscando su próxima victoria.",
            MascotStage::Dominante => "Un espécimen imponente que domina su entorno.",
            MascotStage::Apex => "El depredador supremo. Nada detiene tu voluntad.",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            MascotStage::Cria => "Sigue forjando tu voluntad para crecer.",
            MascotStage::Cazador => "Estás encontrando tu ritmo. ¡No te detengas!",
            MascotStage::Dominante => "Tu consistencia es tu mayor fuerza.",
            MascotStage::Apex => "Eres la personificación de la disciplina.",
        }
    }
}

/// Mascot mood, derived from the current Forja Index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MascotMood {
    Cansado,
    Neutral,
    Motivado,
    Feroz,
}

impl MascotMood {
    pub fn from_index(index: u32) -> Self {
        match index {
            0..=29 => MascotMood::Cansado,
            30..=59 => MascotMood::Neutral,
            60..=89 => MascotMood::Motivado,
            _ => MascotMood::Feroz,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MascotMood::Cansado => "Cansado",
            MascotMood::Neutral => "Neutral",
            MascotMood::Motivado => "Motivado",
            MascotMood::Feroz => "Feroz",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MascotProfile {
    pub stage: MascotStage,
    pub mood: MascotMood,
    pub index: u32,
    pub streak: u32,
    pub total_exp: u32,
    pub description: String,
    pub message: String,
}

/// Recomputed on every read; nothing here is persisted.
pub fn mascot_profile(store: &dyn Store) -> Result<MascotProfile, ForjaError> {
    let index = forja_index(store)?.index;
    let streak = store.get_streak_record()?.current_streak;
    let total_exp = store.get_user_stats()?.total_exp;
    let stage = MascotStage::from_total_exp(total_exp);

    Ok(MascotProfile {
        stage,
        mood: MascotMood::from_index(index),
        index,
        streak,
        total_exp,
        description: stage.description().to_string(),
        message: stage.message().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_level_thresholds() {
        assert_eq!(level_for_exp(0), 1);
        assert_eq!(level_for_exp(99), 1);
        assert_eq!(level_for_exp(100), 2);
        assert_eq!(level_for_exp(399), 2);
        assert_eq!(level_for_exp(400), 3);
        assert_eq!(level_for_exp(900), 4);
    }

    #[test]
    fn test_salud_feeds_strength() {
        let store = MemoryStore::new();
        let stats = add_experience(&store, Category::Salud, 10).unwrap();
        assert_eq!(stats.strength, 10);
        assert_eq!(stats.total_exp, 10);
        assert_eq!(stats.discipline, 0);
    }

    #[test]
    fn test_otros_adds_half_plus_flat() {
        let store = MemoryStore::new();
        let stats = add_experience(&store, Category::Otros, 10).unwrap();
        assert_eq!(stats.total_exp, 15);
        assert_eq!(stats.strength + stats.discipline + stats.wisdom, 0);
    }

    #[test]
    fn test_trabajo_and_personal_share_discipline() {
        let store = MemoryStore::new();
        add_experience(&store, Category::Trabajo, 10).unwrap();
        let stats = add_experience(&store, Category::Personal, 10).unwrap();
        assert_eq!(stats.discipline, 20);
        assert_eq!(stats.total_exp, 20);
    }

    #[test]
    fn test_subtract_clamps_at_zero() {
        let store = MemoryStore::new();
        add_experience(&store, Category::Estudio, 3).unwrap();
        let stats = subtract_experience(&store, Category::Estudio, 5).unwrap();
        assert_eq!(stats.wisdom, 0);
        assert_eq!(stats.total_exp, 0);

        let row = store
            .get_category_progress()
            .unwrap()
            .into_iter()
            .find(|r| r.name == Category::Estudio)
            .unwrap();
        assert_eq!(row.exp, 0);
        assert_eq!(row.level, 1);
    }

    #[test]
    fn test_category_level_recomputed() {
        let store = MemoryStore::new();
        add_experience(&store, Category::Salud, 400).unwrap();
        let row = store
            .get_category_progress()
            .unwrap()
            .into_iter()
            .find(|r| r.name == Category::Salud)
            .unwrap();
        assert_eq!(row.exp, 400);
        assert_eq!(row.level, 3);
    }

    #[test]
    fn test_retry_double_counts() {
        let store = MemoryStore::new();
        add_experience(&store, Category::Salud, 10).unwrap();
        let stats = add_experience(&store, Category::Salud, 10).unwrap();
        assert_eq!(stats.strength, 20);
    }

    #[test]
    fn test_stage_and_mood_thresholds() {
        assert_eq!(MascotStage::from_total_exp(149), MascotStage::Cria);
        assert_eq!(MascotStage::from_total_exp(150), MascotStage::Cazador);
        assert_eq!(MascotStage::from_total_exp(999), MascotStage::Dominante);
        assert_eq!(MascotStage::from_total_exp(1000), MascotStage::Apex);

        assert_eq!(MascotMood::from_index(29), MascotMood::Cansado);
        assert_eq!(MascotMood::from_index(30), MascotMood::Neutral);
        assert_eq!(MascotMood::from_index(89), MascotMood::Motivado);
        assert_eq!(MascotMood::from_index(90), MascotMood::Feroz);
    }

    #[test]
    fn test_profile_for_fresh_store() {
        let store = MemoryStore::new();
        let profile = mascot_profile(&store).unwrap();
        assert_eq!(profile.stage, MascotStage::Cria);
        assert_eq!(profile.mood, MascotMood::Cansado);
        assert_eq!(profile.streak, 0);
    }
}
