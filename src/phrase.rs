use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::timeout;

use crate::error::{ErrorKind, ForjaError};
use crate::state::app::AppState;

pub const FALLBACK_AUTHOR: &str = "Sabiduría Komodo";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPhrase {
    pub phrase: String,
    pub author: String,
    pub date: NaiveDate,
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Accepts `{phrase|text, author}`; any other shape is kept as raw JSON text.
pub fn parse_phrase_payload(value: &Value, date: NaiveDate) -> DailyPhrase {
    let phrase = non_empty_str(value, "phrase")
        .or_else(|| non_empty_str(value, "text"))
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string());
    let author = non_empty_str(value, "author").unwrap_or(FALLBACK_AUTHOR);

    DailyPhrase {
        phrase,
        author: author.to_string(),
        date,
    }
}

/// Cached phrase from disk. A missing or unreadable file is a cache miss.
pub async fn load_cached(path: &Path) -> Option<DailyPhrase> {
    match tokio::fs::read_to_string(path).await {
        Ok(data) => match serde_json::from_str::<DailyPhrase>(&data) {
            Ok(phrase) => Some(phrase),
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "Failed to parse phrase cache, ignoring it");
                None
            }
        },
        Err(e) => {
            tracing::debug!(path = ?path, error = %e, "No phrase cache on disk");
            None
        }
    }
}

pub async fn save_cached(path: &Path, phrase: &DailyPhrase) -> Result<(), ForjaError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            ForjaError::from(e).with_context(format!("path: {:?}", parent))
        })?;
    }
    let json = serde_json::to_string_pretty(phrase)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| ForjaError::from(e).with_context(format!("path: {:?}", path)))?;
    Ok(())
}

pub async fn fetch_phrase(url: &str, limit: Duration, date: NaiveDate) -> Result<DailyPhrase, ForjaError> {
    let client = Client::builder().timeout(limit).build()?;

    let body = timeout(limit, async {
        let response = client.get(url).send().await?.error_for_status()?;
        Ok::<Value, reqwest::Error>(response.json::<Value>().await?)
    })
    .await??;

    Ok(parse_phrase_payload(&body, date))
}

/// Today's phrase: memory cache, then disk cache, then the network.
///
/// Returns `None` when fetching is disabled or fails; the failure is logged
/// and the next call tries again.
pub async fn daily_phrase(state: &AppState, today: NaiveDate) -> Option<DailyPhrase> {
    if let Some(phrase) = state.cached_phrase(today) {
        return Some(phrase);
    }

    if let Some(phrase) = load_cached(&state.phrase_cache_file).await {
        if phrase.date == today {
            state.set_cached_phrase(phrase.clone());
            return Some(phrase);
        }
    }

    let url = state.config.phrase_url.as_deref()?;
    let limit = Duration::from_secs(state.config.phrase_timeout_secs);
    match fetch_phrase(url, limit, today).await {
        Ok(phrase) => {
            if let Err(e) = save_cached(&state.phrase_cache_file, &phrase).await {
                tracing::warn!(error = %e, "Failed to persist daily phrase");
            }
            state.set_cached_phrase(phrase.clone());
            tracing::info!(date = %today, author = %phrase.author, "Daily phrase fetched");
            Some(phrase)
        }
        Err(e) => {
            let e = if e.kind == ErrorKind::Network {
                e.with_context(format!("url: {}", url))
            } else {
                e
            };
            tracing::warn!(error = %e, "Failed to fetch daily phrase");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 1).unwrap()
    }

    fn temp_file(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("forja-phrase-{}-{}", std::process::id(), name))
            .join("daily_phrase.json")
    }

    #[test]
    fn test_payload_shapes() {
        let p = parse_phrase_payload(&json!({"phrase": "Hoy", "author": "Ana"}), today());
        assert_eq!(p.phrase, "Hoy");
        assert_eq!(p.author, "Ana");

        let p = parse_phrase_payload(&json!({"text": "Sigue"}), today());
        assert_eq!(p.phrase, "Sigue");
        assert_eq!(p.author, FALLBACK_AUTHOR);

        let p = parse_phrase_payload(&json!(["x"]), today());
        assert_eq!(p.phrase, "[\"x\"]");
    }

    #[tokio::test]
    async fn test_disabled_without_url() {
        let state = AppState::in_memory().with_phrase_cache_file(temp_file("disabled"));
        assert!(daily_phrase(&state, today()).await.is_none());
    }

    #[tokio::test]
    async fn test_disk_cache_hit_for_today_only() {
        let path = temp_file("disk");
        let cached = DailyPhrase {
            phrase: "Forja".into(),
            author: FALLBACK_AUTHOR.into(),
            date: today(),
        };
        save_cached(&path, &cached).await.unwrap();

        let state = AppState::in_memory().with_phrase_cache_file(path.clone());
        assert_eq!(daily_phrase(&state, today()).await, Some(cached.clone()));
        assert_eq!(state.cached_phrase(today()), Some(cached));

        let tomorrow = today().succ_opt().unwrap();
        assert!(daily_phrase(&state, tomorrow).await.is_none());

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_a_miss() {
        let path = temp_file("corrupt");
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, "not json").await.unwrap();
        assert!(load_cached(&path).await.is_none());
        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }
}
