use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Task categories. Each one feeds a category progress row and,
/// except `Otros`, one attribute bucket of the user stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Trabajo,
    Salud,
    Estudio,
    Personal,
    Otros,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Trabajo,
        Category::Salud,
        Category::Estudio,
        Category::Personal,
        Category::Otros,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Trabajo => "Trabajo",
            Category::Salud => "Salud",
            Category::Estudio => "Estudio",
            Category::Personal => "Personal",
            Category::Otros => "Otros",
        }
    }

    /// Display color of the category progress row
    pub fn color(&self) -> &'static str {
        match self {
            Category::Trabajo => "#3880ff",
            Category::Salud => "#2dd36f",
            Category::Estudio => "#ffc409",
            Category::Personal => "#eb445a",
            Category::Otros => "#92949c",
        }
    }

    /// Lenient parse: anything unrecognised lands in `Otros`.
    pub fn parse(s: &str) -> Category {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .unwrap_or(Category::Otros)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Category::parse(s))
    }
}

/// `HH:MM` (de)serialization for optional times of day.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(t) => serializer.serialize_some(&t.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(s) if !s.is_empty() => super::parse_time(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}

/// Parse a `HH:MM` time, also accepting `HH:MM:SS`.
pub fn parse_time(s: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(s, hhmm::FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
}

pub fn format_time(t: &NaiveTime) -> String {
    t.format(hhmm::FORMAT).to_string()
}

pub fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub completed: bool,
    pub category: Category,
    pub date: NaiveDate,
    #[serde(default, with = "hhmm")]
    pub due_time: Option<NaiveTime>,
}

/// A task before it has been assigned an id by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub category: Category,
    pub date: NaiveDate,
    #[serde(default, with = "hhmm")]
    pub due_time: Option<NaiveTime>,
}

/// Closure record of one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLog {
    #[serde(default)]
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub completed_count: u32,
    pub total_count: u32,
    #[serde(default)]
    pub reflection: Option<String>,
}

impl DailyLog {
    pub fn new(date: NaiveDate, completed_count: u32, total_count: u32) -> Self {
        DailyLog {
            id: None,
            date,
            completed_count,
            total_count,
            reflection: None,
        }
    }

    pub fn with_reflection<S: Into<String>>(mut self, reflection: S) -> Self {
        self.reflection = Some(reflection.into());
        self
    }

    /// Completed/total, or `None` for a day without tasks
    pub fn completion_ratio(&self) -> Option<f64> {
        if self.total_count > 0 {
            Some(self.completed_count as f64 / self.total_count as f64)
        } else {
            None
        }
    }

    /// At least one task and all of them done
    pub fn is_perfect(&self) -> bool {
        self.total_count > 0 && self.completed_count == self.total_count
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub current_streak: u32,
    pub last_completed_date: Option<NaiveDate>,
    pub best_streak: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub strength: u32,
    pub discipline: u32,
    pub wisdom: u32,
    pub total_exp: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryProgress {
    pub name: Category,
    pub exp: u32,
    pub level: u32,
    pub color: String,
}

impl CategoryProgress {
    /// Fresh row for a category: no experience, level 1
    pub fn seed(name: Category) -> Self {
        CategoryProgress {
            name,
            exp: 0,
            level: 1,
            color: name.color().to_string(),
        }
    }
}

/// A recurring daily item, tracked only by the last date it was completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ritual {
    pub id: i64,
    pub title: String,
    pub category: Category,
    #[serde(default, with = "hhmm")]
    pub due_time: Option<NaiveTime>,
    pub active: bool,
    pub last_completed_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRitual {
    pub title: String,
    pub category: Category,
    #[serde(default, with = "hhmm")]
    pub due_time: Option<NaiveTime>,
}
