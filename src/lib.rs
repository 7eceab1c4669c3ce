//! Forja: a daily habit tracker core. Tasks are closed into daily logs that
//! drive streaks, the Forja Index, experience levels and weekly reports.

pub mod achievements;
pub mod commands;
pub mod config;
pub mod day;
pub mod engine;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod notify;
pub mod phrase;
pub mod recap;
pub mod rituals;
pub mod state;
pub mod store;
pub mod tasks;

pub use error::{ErrorKind, ForjaError};
pub use state::app::AppState;
pub use store::{MemoryStore, SqliteStore, Store, StoreError};
