use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use chrono::NaiveTime;
use lazy_static::lazy_static;

use crate::error::{ErrorKind, ForjaError};
use crate::model::parse_time;

pub const DEFAULT_PHRASE_URL: &str = "https://www.positive-api.online/phrase/esp";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file; defaults to `forja.db` in the app data directory
    pub database_path: Option<PathBuf>,
    pub log_level: String,
    /// JSON log lines instead of human-readable output
    pub log_json: bool,
    /// Experience granted when a task is completed
    pub experience_gain: u32,
    /// Experience removed when a completed task is reopened
    pub experience_loss: u32,
    pub reflection_reminder_time: String,
    pub task_prompt_time: String,
    /// Daily phrase endpoint; `None` disables fetching
    pub phrase_url: Option<String>,
    pub phrase_timeout_secs: u64,
    pub positive_keywords: Option<Vec<String>>,
    pub negative_keywords: Option<Vec<String>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: None,
            log_level: "info".to_string(),
            log_json: false,
            experience_gain: 10,
            experience_loss: 5,
            reflection_reminder_time: "21:00".to_string(),
            task_prompt_time: "10:00".to_string(),
            phrase_url: Some(DEFAULT_PHRASE_URL.to_string()),
            phrase_timeout_secs: 5,
            positive_keywords: None,
            negative_keywords: None,
        }
    }
}

impl AppConfig {
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| super::data_file("forja.db"))
    }

    pub fn reflection_reminder(&self) -> NaiveTime {
        time_or(&self.reflection_reminder_time, 21)
    }

    pub fn task_prompt(&self) -> NaiveTime {
        time_or(&self.task_prompt_time, 10)
    }

    /// Reject values that would make the engines misbehave
    pub fn validate(&self) -> Result<(), ForjaError> {
        for (field, value) in [
            ("reflection_reminder_time", &self.reflection_reminder_time),
            ("task_prompt_time", &self.task_prompt_time),
        ] {
            parse_time(value).map_err(|e| {
                ForjaError::new(ErrorKind::Config, format!("{} is not HH:MM: {}", field, e), "config")
                    .with_context(value.clone())
            })?;
        }
        if self.phrase_timeout_secs == 0 {
            return Err(ForjaError::new(
                ErrorKind::Config,
                "phrase_timeout_secs must be positive",
                "config",
            ));
        }
        Ok(())
    }
}

fn time_or(value: &str, fallback_hour: u32) -> NaiveTime {
    parse_time(value).unwrap_or_else(|_| {
        NaiveTime::from_hms_opt(fallback_hour, 0, 0).unwrap_or(NaiveTime::MIN)
    })
}

/// Where the active configuration came from, reported once logging is up
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
    Invalid { path: PathBuf, reason: String },
}

struct LoadedConfig {
    config: AppConfig,
    source: ConfigSource,
}

fn get_config_path() -> PathBuf {
    match std::env::var_os("FORJA_CONFIG") {
        Some(path) => PathBuf::from(path),
        None => super::data_file("forja.toml"),
    }
}

/// Parse a TOML document into a validated config
pub fn parse_config(content: &str) -> Result<AppConfig, ForjaError> {
    let config: AppConfig = toml::from_str(content).map_err(|e| {
        ForjaError::new(ErrorKind::Config, format!("Failed to parse config: {}", e), "config")
            .with_source("toml")
    })?;
    config.validate()?;
    Ok(config)
}

fn load_config_internal() -> LoadedConfig {
    let config_path = get_config_path();

    match fs::read_to_string(&config_path) {
        Ok(content) => match parse_config(&content) {
            Ok(config) => LoadedConfig {
                config,
                source: ConfigSource::File(config_path),
            },
            Err(e) => LoadedConfig {
                config: AppConfig::default(),
                source: ConfigSource::Invalid {
                    path: config_path,
                    reason: e.to_string(),
                },
            },
        },
        Err(_) => LoadedConfig {
            config: AppConfig::default(),
            source: ConfigSource::Defaults,
        },
    }
}

lazy_static! {
    static ref APP_CONFIG: LoadedConfig = load_config_internal();
}

/// Get the cached configuration (loaded once per process)
pub fn get_app_config() -> &'static AppConfig {
    &APP_CONFIG.config
}

pub fn config_source() -> &'static ConfigSource {
    &APP_CONFIG.source
}

/// Report how the configuration was resolved. Call after logging is initialized.
pub fn log_config_source() {
    match config_source() {
        ConfigSource::File(path) => tracing::info!(path = ?path, "Loaded config"),
        ConfigSource::Defaults => tracing::info!("No config file found, using defaults"),
        ConfigSource::Invalid { path, reason } => {
            tracing::warn!(path = ?path, reason = %reason, "Invalid config, using defaults")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse_config("experience_gain = 20\nlog_json = true\n").unwrap();
        assert_eq!(config.experience_gain, 20);
        assert!(config.log_json);
        assert_eq!(config.experience_loss, 5);
        assert_eq!(config.reflection_reminder(), NaiveTime::from_hms_opt(21, 0, 0).unwrap());
    }

    #[test]
    fn test_keyword_overrides() {
        let config = parse_config("positive_keywords = [\"genial\"]\n").unwrap();
        assert_eq!(config.positive_keywords, Some(vec!["genial".to_string()]));
        assert!(config.negative_keywords.is_none());
    }

    #[test]
    fn test_rejects_bad_reminder_time() {
        let err = parse_config("task_prompt_time = \"25:99\"\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Config);
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(parse_config("experience_gain = \"ten\"").is_err());
    }
}
