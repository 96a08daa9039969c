// src/error.rs

//! Unified error handling for the career crawler.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed before a status was received
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

    /// Timeout, connection reset, 5xx or an unreadable body. Retried.
    #[error("Transient fetch error for {url}: {message}")]
    TransientFetch { url: String, message: String },

    /// 4xx (other than rate limiting) or a career URL the adapter cannot use.
    #[error("Permanent fetch error for {url}: {message}")]
    PermanentFetch {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// Still rate limited after the cooldown retry.
    #[error("Rate limited by {url}")]
    RateLimited { url: String },

    /// Navigation into an authentication or application flow was refused.
    #[error("Safety stop at {url}: {reason}")]
    SafetyStop { url: String, reason: String },

    /// Headless browser failure
    #[error("Browser error: {0}")]
    Browser(String),

    /// A company pipeline exceeded its wall-clock budget.
    #[error("Timed out after {secs}s crawling {company}")]
    Timeout { company: String, secs: u64 },

    /// Dedup store could not be read or written.
    #[error("Dedup store corrupted or unavailable: {0}")]
    StoreCorruption(String),
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

    /// Create a transient fetch error.
    pub fn transient(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::TransientFetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a permanent fetch error.
    pub fn permanent(url: impl Into<String>, status: Option<u16>, message: impl fmt::Display) -> Self {
        Self::PermanentFetch {
            url: url.into(),
            status,
            message: message.to_string(),
        }
    }

    /// Create a malformed-URL error for a career URL an adapter cannot parse.
    pub fn bad_career_url(url: impl Into<String>, expected: &str) -> Self {
        Self::PermanentFetch {
            url: url.into(),
            status: None,
            message: format!("expected {expected}"),
        }
    }

    /// Create a safety stop.
    pub fn safety_stop(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SafetyStop {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a browser error.
    pub fn browser(message: impl fmt::Display) -> Self {
        Self::Browser(message.to_string())
    }

    /// Create a store corruption error.
    pub fn store(message: impl fmt::Display) -> Self {
        Self::StoreCorruption(message.to_string())
    }

    /// Whether a retry could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::TransientFetch { .. } | Self::RateLimited { .. } => true,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            _ => false,
        }
    }

    /// Whether the whole run must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StoreCorruption(_))
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        Self::StoreCorruption(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(AppError::transient("u", "503").is_transient());
        assert!(AppError::RateLimited { url: "u".into() }.is_transient());
        assert!(!AppError::permanent("u", Some(404), "not found").is_transient());
        assert!(!AppError::safety_stop("u", "login").is_transient());
        assert!(AppError::store("disk I/O error").is_fatal());
        assert!(!AppError::transient("u", "503").is_fatal());
    }

    #[test]
    fn test_rusqlite_errors_are_store_corruption() {
        let err: AppError = rusqlite::Error::InvalidQuery.into();
        assert!(err.is_fatal());
    }
}
