// src/error.rs

//! Unified error handling for the tracker application.

use std::fmt;

use thiserror::Error;

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Run lock could not be acquired or released
    #[error("Lock error: {0}")]
    Lock(String),

    /// Port collection error
    #[error("Collect error for {context}: {message}")]
    Collect { context: String, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a lock error.
    pub fn lock(message: impl Into<String>) -> Self {
        Self::Lock(message.into())
    }

    /// Create a collect error with context.
    pub fn collect(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Collect {
            context: context.into(),
            message: message.to_string(),
        }
    }
}

/// Failure of a single trip lookup.
///
/// Every variant is transient from the tracker's point of view: the vessel
/// goes back on the retry queue.
#[derive(Error, Debug)]
pub enum LookupError {
    /// The lookup did not complete within the configured timeout
    #[error("lookup timed out after {0}s")]
    Timeout(u64),

    /// The page could not be fetched
    #[error("transport failure: {0}")]
    Transport(String),

    /// The page was fetched but could not be interpreted
    #[error("parse failure: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_error_messages_are_human_readable() {
        assert_eq!(
            LookupError::Timeout(15).to_string(),
            "lookup timed out after 15s"
        );
        assert_eq!(
            LookupError::Parse("missing trip section".into()).to_string(),
            "parse failure: missing trip section"
        );
    }

    #[test]
    fn test_collect_error_context() {
        let err = AppError::collect("port 42", "no details link");
        assert_eq!(err.to_string(), "Collect error for port 42: no details link");
    }
}
