use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::config::settings::AppConfig;
use crate::engine::{percent, HISTORY_WINDOW};
use crate::error::ForjaError;
use crate::model::DailyLog;
use crate::store::Store;

const WEEK: usize = 7;
/// Percentage points the weekly average must move to count as a trend
const TREND_MARGIN: f64 = 5.0;

const POSITIVE_KEYWORDS: &[&str] = &[
    "logré", "bueno", "éxito", "disciplina", "mejor", "fuerte", "voluntad", "pude", "conseguí",
    "avanzando",
];
const NEGATIVE_KEYWORDS: &[&str] = &[
    "cansado", "fallé", "difícil", "pereza", "mal", "frustrado", "perdí", "distracción",
    "procrastiné", "mañana",
];

/// Keyword lists used to score reflections, overridable through configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentimentLexicon {
    positive: Vec<String>,
    negative: Vec<String>,
}

impl SentimentLexicon {
    pub fn new<I, S>(positive: I, negative: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let normalize = |words: I| -> Vec<String> {
            words
                .into_iter()
                .map(|w| {
                    let w: String = w.into();
                    w.trim().to_lowercase()
                })
                .filter(|w| !w.is_empty())
                .collect()
        };
        SentimentLexicon {
            positive: normalize(positive),
            negative: normalize(negative),
        }
    }

    /// Defaults, with whichever list the config overrides replaced
    pub fn from_config(config: &AppConfig) -> Self {
        let defaults = Self::default();
        SentimentLexicon {
            positive: config
                .positive_keywords
                .as_ref()
                .map(|words| Self::new(words.clone(), Vec::new()).positive)
                .unwrap_or(defaults.positive),
            negative: config
                .negative_keywords
                .as_ref()
                .map(|words| Self::new(Vec::new(), words.clone()).negative)
                .unwrap_or(defaults.negative),
        }
    }

    /// (positive, negative): how many keywords of each list appear in `text`
    pub fn score(&self, text: &str) -> (usize, usize) {
        let text = text.to_lowercase();
        let hits = |words: &[String]| words.iter().filter(|w| text.contains(w.as_str())).count();
        (hits(&self.positive), hits(&self.negative))
    }

    pub fn classify(&self, text: &str) -> Sentiment {
        let (pos, neg) = self.score(text);
        if pos > neg + 2 {
            Sentiment::Positive
        } else if neg > pos + 1 {
            Sentiment::Fatigue
        } else {
            Sentiment::Stable
        }
    }
}

impl Default for SentimentLexicon {
    fn default() -> Self {
        Self::new(
            POSITIVE_KEYWORDS.iter().copied(),
            NEGATIVE_KEYWORDS.iter().copied(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Fatigue,
    Stable,
}

impl Sentiment {
    pub fn summary(&self) -> &'static str {
        match self {
            Sentiment::Positive => {
                "Tu tono es altamente positivo y resiliente. Estás dominando tu mente."
            }
            Sentiment::Fatigue => {
                "Detecto patrones de fatiga o frustración. Recuerda que la disciplina es amor propio."
            }
            Sentiment::Stable => "Tus reflexiones muestran un equilibrio emocional estable.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub avg_completion: u32,
    pub trend: Trend,
    pub weak_day: String,
    pub peak_day: String,
    pub sentiment: Sentiment,
    pub sentiment_summary: String,
    pub advice: String,
    pub total_tasks: u32,
    pub completed_tasks: u32,
}

pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "lunes",
        Weekday::Tue => "martes",
        Weekday::Wed => "miércoles",
        Weekday::Thu => "jueves",
        Weekday::Fri => "viernes",
        Weekday::Sat => "sábado",
        Weekday::Sun => "domingo",
    }
}

/// (completed, total, completion percentage) of a window
fn window_totals(window: &[DailyLog]) -> (u32, u32, f64) {
    let total: u32 = window.iter().map(|l| l.total_count).sum();
    let completed: u32 = window.iter().map(|l| l.completed_count).sum();
    let pct = if total > 0 {
        completed as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    (completed, total, pct)
}

fn advice_for(trend: Trend, avg: f64) -> &'static str {
    if trend == Trend::Down {
        "Has bajado el ritmo. El acero se enfría si no lo golpeas. Retoma la intensidad."
    } else if avg > 90.0 {
        "Tu voluntad es pura. Estás listo para desafíos más grandes."
    } else if avg < 50.0 {
        "Menos del 50%. No permitas que la mediocridad gane. Reorganiza tu día."
    } else {
        "Sigue forjando. No te detengas."
    }
}

/// Peak and weak day of a window scanned oldest-first.
/// Later entries win ties; zero-task days score 0 here.
fn peak_and_weak(window: &[DailyLog]) -> Option<(&DailyLog, &DailyLog)> {
    let ratio = |log: &DailyLog| log.completion_ratio().unwrap_or(0.0);
    let first = window.first()?;
    let (mut peak, mut weak) = (first, first);
    for log in window {
        if ratio(log) >= ratio(peak) {
            peak = log;
        }
        if ratio(log) <= ratio(weak) {
            weak = log;
        }
    }
    Some((peak, weak))
}

/// Build the report from a history ordered most recent first.
///
/// The two weeks are positional: the first seven entries are "this week",
/// the next seven "last week", whatever their calendar dates.
pub fn build_report(history: &[DailyLog], lexicon: &SentimentLexicon) -> Result<WeeklyReport, ForjaError> {
    let split = history.len().min(WEEK);
    let mut last_week: Vec<DailyLog> = history[..split].to_vec();
    let mut prev_week: Vec<DailyLog> = history[split..history.len().min(2 * WEEK)].to_vec();
    last_week.reverse();
    prev_week.reverse();

    let (peak, weak) = peak_and_weak(&last_week).ok_or_else(|| {
        ForjaError::insufficient_data("No hay suficientes datos para generar un reporte.", "weekly_report")
    })?;

    let (completed_tasks, total_tasks, avg) = window_totals(&last_week);
    let (_, _, prev_avg) = window_totals(&prev_week);

    let trend = if avg > prev_avg + TREND_MARGIN {
        Trend::Up
    } else if avg < prev_avg - TREND_MARGIN {
        Trend::Down
    } else {
        Trend::Stable
    };

    let reflections = last_week
        .iter()
        .map(|l| l.reflection.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(" ");
    let sentiment = lexicon.classify(&reflections);

    let start_date = last_week.first().map(|l| l.date).unwrap_or(peak.date);
    let end_date = last_week.last().map(|l| l.date).unwrap_or(peak.date);

    Ok(WeeklyReport {
        start_date,
        end_date,
        avg_completion: percent(avg),
        trend,
        weak_day: weekday_name(weak.date).to_string(),
        peak_day: weekday_name(peak.date).to_string(),
        sentiment,
        sentiment_summary: sentiment.summary().to_string(),
        advice: advice_for(trend, avg).to_string(),
        total_tasks,
        completed_tasks,
    })
}

/// Weekly report over the last 14 closures on or before `reference_date`.
/// Fails with `InsufficientData` when there is no closure to report on.
pub fn generate_weekly_report(
    store: &dyn Store,
    reference_date: NaiveDate,
    lexicon: &SentimentLexicon,
) -> Result<WeeklyReport, ForjaError> {
    let history = store.list_logs_until(reference_date, HISTORY_WINDOW)?;

    let report = build_report(&history, lexicon)?;
    tracing::info!(
        reference = %reference_date,
        avg = report.avg_completion,
        trend = ?report.trend,
        sentiment = ?report.sentiment,
        "Weekly report generated"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn log(date: &str, completed: u32, total: u32, reflection: Option<&str>) -> DailyLog {
        DailyLog {
            id: None,
            date: crate::model::parse_date(date).unwrap(),
            completed_count: completed,
            total_count: total,
            reflection: reflection.map(str::to_string),
        }
    }

    #[test]
    fn test_up_trend_with_positive_tone() {
        let mut history = vec![log("2026-02-19", 10, 10, Some("bueno éxito disciplina mejor fuerte")); 7];
        history.extend(vec![log("2026-02-12", 5, 10, Some("cansado")); 7]);

        let report = build_report(&history, &SentimentLexicon::default()).unwrap();
        assert_eq!(report.avg_completion, 100);
        assert_eq!(report.trend, Trend::Up);
        assert_eq!(report.sentiment, Sentiment::Positive);
        assert!(report.sentiment_summary.contains("positivo"));
    }

    #[test]
    fn test_peak_and_weak_days() {
        let mut history = vec![
            log("2026-02-19", 10, 10, None),
            log("2026-02-18", 0, 10, None),
        ];
        history.extend(vec![log("2026-02-17", 5, 10, None); 5]);
        history.extend(vec![log("2026-02-10", 5, 10, None); 7]);

        let report = build_report(&history, &SentimentLexicon::default()).unwrap();
        assert_eq!(report.peak_day, "jueves");
        assert_eq!(report.weak_day, "miércoles");
    }

    #[test]
    fn test_fatigue_sentiment() {
        let history = vec![log("2026-02-19", 5, 10, Some("fallé porque estaba cansado y tuve pereza")); 14];
        let report = build_report(&history, &SentimentLexicon::default()).unwrap();
        assert_eq!(report.sentiment, Sentiment::Fatigue);
        assert!(report.sentiment_summary.contains("fatiga"));
    }

    #[test]
    fn test_identical_half_days_are_stable() {
        let history = vec![log("2026-02-19", 5, 10, None); 14];
        let report = build_report(&history, &SentimentLexicon::default()).unwrap();
        assert_eq!(report.trend, Trend::Stable);
        assert_eq!(report.avg_completion, 50);
        assert_eq!(report.sentiment, Sentiment::Stable);
        assert_eq!(report.sentiment_summary, Sentiment::Stable.summary());
        assert_eq!(report.advice, "Sigue forjando. No te detengas.");
    }

    #[test]
    fn test_empty_history_is_insufficient_data() {
        let err = build_report(&[], &SentimentLexicon::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InsufficientData);
        assert!(err.message.contains("No hay suficientes datos"));
    }

    #[test]
    fn test_down_trend_advice_wins() {
        let mut history = vec![log("2026-02-19", 1, 10, None); 7];
        history.extend(vec![log("2026-02-12", 10, 10, None); 7]);
        let report = build_report(&history, &SentimentLexicon::default()).unwrap();
        assert_eq!(report.trend, Trend::Down);
        assert!(report.advice.starts_with("Has bajado el ritmo"));
    }

    #[test]
    fn test_short_history_compares_against_empty_week() {
        let history = vec![log("2026-02-19", 3, 4, None), log("2026-02-18", 1, 4, None)];
        let report = build_report(&history, &SentimentLexicon::default()).unwrap();
        assert_eq!(report.start_date, crate::model::parse_date("2026-02-18").unwrap());
        assert_eq!(report.end_date, crate::model::parse_date("2026-02-19").unwrap());
        assert_eq!(report.total_tasks, 8);
        assert_eq!(report.completed_tasks, 4);
        assert_eq!(report.trend, Trend::Up);
    }

    #[test]
    fn test_report_ignores_logs_after_reference_date() {
        let store = crate::store::MemoryStore::new();
        store.upsert_daily_log(&log("2026-03-01", 1, 1, None)).unwrap();
        store.upsert_daily_log(&log("2026-03-05", 0, 1, Some("cansado y mal"))).unwrap();

        let reference = crate::model::parse_date("2026-03-02").unwrap();
        let report = generate_weekly_report(&store, reference, &SentimentLexicon::default()).unwrap();
        assert_eq!(report.start_date, crate::model::parse_date("2026-03-01").unwrap());
        assert_eq!(report.end_date, crate::model::parse_date("2026-03-01").unwrap());
        assert_eq!(report.avg_completion, 100);
        assert_eq!(report.total_tasks, 1);
        assert_eq!(report.sentiment, Sentiment::Stable);
    }

    #[test]
    fn test_lexicon_counts_distinct_keywords() {
        let lexicon = SentimentLexicon::default();
        assert_eq!(lexicon.score("Cansado, CANSADO y mal"), (0, 2));
    }

    #[test]
    fn test_lexicon_config_override() {
        let config = AppConfig {
            positive_keywords: Some(vec!["Genial".into()]),
            ..AppConfig::default()
        };
        let lexicon = SentimentLexicon::from_config(&config);
        assert_eq!(lexicon.score("genial día, pero cansado"), (1, 1));
    }
}
