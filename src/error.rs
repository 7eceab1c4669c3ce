use serde::{Serialize, Deserialize};
use std::fmt;

use crate::store::StoreError;

/// Broad classification of a failure, used by callers to pick user-facing messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Not enough history to compute the requested view (e.g. an empty weekly window)
    InsufficientData,
    /// The backing store failed or is unavailable
    Storage,
    NotFound,
    InvalidInput,
    Config,
    Io,
    Network,
}

/// Unified error type for the whole crate.
/// Services return Result<T, ForjaError>; the command layer turns it into a String.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForjaError {
    pub kind: ErrorKind,
    pub message: String,
    pub stage: String,
    pub context: Option<String>,
    pub source: Option<String>,
}

impl ForjaError {
    /// Create a new error with kind, stage and message
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S, stage: &'static str) -> Self {
        ForjaError {
            kind,
            message: message.into(),
            stage: stage.to_string(),
            context: None,
            source: None,
        }
    }

    pub fn insufficient_data<S: Into<String>>(message: S, stage: &'static str) -> Self {
        Self::new(ErrorKind::InsufficientData, message, stage)
    }

    pub fn not_found<S: Into<String>>(message: S, stage: &'static str) -> Self {
        Self::new(ErrorKind::NotFound, message, stage)
    }

    pub fn invalid_input<S: Into<String>>(message: S, stage: &'static str) -> Self {
        Self::new(ErrorKind::InvalidInput, message, stage)
    }

    /// Add additional context information
    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add source error information
    pub fn with_source<S: Into<String>>(mut self, source: S) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for ForjaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)?;
        if let Some(ref context) = self.context {
            write!(f, " (context: {})", context)?;
        }
        if let Some(ref source) = self.source {
            write!(f, " (source: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ForjaError {}

impl From<StoreError> for ForjaError {
    fn from(err: StoreError) -> Self {
        let kind = match err {
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::Invalid(_) => ErrorKind::InvalidInput,
            _ => ErrorKind::Storage,
        };
        ForjaError::new(kind, err.to_string(), "store").with_source("store")
    }
}

impl From<std::io::Error> for ForjaError {
    fn from(err: std::io::Error) -> Self {
        ForjaError::new(ErrorKind::Io, format!("I/O error: {}", err), "io")
            .with_source("std::io")
    }
}

impl From<serde_json::Error> for ForjaError {
    fn from(err: serde_json::Error) -> Self {
        ForjaError::new(ErrorKind::Io, format!("JSON error: {}", err), "json_parse")
            .with_source("serde_json")
    }
}

impl From<reqwest::Error> for ForjaError {
    fn from(err: reqwest::Error) -> Self {
        ForjaError::new(ErrorKind::Network, format!("HTTP error: {}", err), "http")
            .with_source("reqwest")
    }
}

impl From<tokio::time::error::Elapsed> for ForjaError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        ForjaError::new(ErrorKind::Network, "Operation timed out", "timeout")
            .with_source("tokio::time")
    }
}
