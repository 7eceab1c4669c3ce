use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::settings::AppConfig;
use crate::engine::trend::SentimentLexicon;
use crate::error::{ErrorKind, ForjaError};
use crate::metrics::Metrics;
use crate::notify::{LogScheduler, ReminderScheduler};
use crate::phrase::DailyPhrase;
use crate::store::{MemoryStore, SqliteStore, Store};

/// Application-wide state container.
/// Collaborators are injected here and passed explicitly to services;
/// nothing in the crate reaches for a global store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub reminders: Arc<dyn ReminderScheduler>,
    pub config: Arc<AppConfig>,
    pub lexicon: Arc<SentimentLexicon>,
    /// Today's phrase once fetched or loaded from disk
    pub phrase_cache: Arc<RwLock<Option<DailyPhrase>>>,
    pub phrase_cache_file: PathBuf,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        reminders: Arc<dyn ReminderScheduler>,
        config: AppConfig,
    ) -> Self {
        AppState {
            store,
            reminders,
            lexicon: Arc::new(SentimentLexicon::from_config(&config)),
            config: Arc::new(config),
            phrase_cache: Arc::new(RwLock::new(None)),
            phrase_cache_file: crate::config::data_file("daily_phrase.json"),
            metrics: Metrics::new(),
        }
    }

    /// State over the SQLite database named by the config
    pub fn open(config: AppConfig, reminders: Arc<dyn ReminderScheduler>) -> Result<Self, ForjaError> {
        let path = config.database_path();
        let store = SqliteStore::open(&path)
            .map_err(|e| ForjaError::from(e).with_context(format!("path: {:?}", path)))?;
        Ok(Self::new(Arc::new(store), reminders, config))
    }

    /// Throwaway state: in-memory store, recorded reminders, no phrase fetching
    pub fn in_memory() -> Self {
        let config = AppConfig {
            phrase_url: None,
            ..AppConfig::default()
        };
        Self::new(Arc::new(MemoryStore::new()), Arc::new(LogScheduler::new()), config)
    }

    pub fn with_phrase_cache_file(mut self, path: PathBuf) -> Self {
        self.phrase_cache_file = path;
        self
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn reminders(&self) -> &dyn ReminderScheduler {
        self.reminders.as_ref()
    }

    /// Count storage failures on the way out of a service call
    pub fn track<T>(&self, result: Result<T, ForjaError>) -> Result<T, ForjaError> {
        if let Err(ref e) = result {
            if e.kind == ErrorKind::Storage {
                self.metrics.record_store_error();
            }
        }
        result
    }

    /// Cached phrase, if it belongs to `date`
    pub fn cached_phrase(&self, date: chrono::NaiveDate) -> Option<DailyPhrase> {
        self.phrase_cache
            .read()
            .as_ref()
            .filter(|p| p.date == date)
            .cloned()
    }

    pub fn set_cached_phrase(&self, phrase: DailyPhrase) {
        *self.phrase_cache.write() = Some(phrase);
    }
}
