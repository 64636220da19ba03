//! Error types for the epubox engine.
//!
//! Uses `thiserror` for structured error definitions that provide
//! clear context about what went wrong.

use thiserror::Error;

/// Error type for the translation capability.
///
/// The first four variants are the failures every backend may report.
/// The rest are raised by the bundled HTTP adapter.
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Backend throttled the request (HTTP 429 or equivalent)
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Backend could not be reached or returned a server error
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Backend does not support translating between these languages
    #[error("Unsupported language pair: {source_lang} -> {target_lang}")]
    InvalidLanguagePair {
        source_lang: String,
        target_lang: String,
    },

    /// Request did not complete in time
    #[error("Translation timed out: {0}")]
    Timeout(String),

    /// HTTP request to API failed
    #[error("API request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error: {0}")]
    ApiError(String),

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Translation was refused by the model
    #[error("Translation refused: {0}")]
    Refused(String),

    /// All retry attempts exhausted
    #[error("All retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    /// Invalid API configuration
    #[error("Invalid API configuration: {0}")]
    InvalidConfig(String),
}

impl TranslationError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TranslationError::RateLimitExceeded(_)
                | TranslationError::BackendUnavailable(_)
                | TranslationError::Timeout(_)
                | TranslationError::HttpError(_)
        )
    }
}

/// Error type for configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse config file
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// Missing required configuration value
    #[error("Missing required config value: {0}")]
    MissingValue(String),

    /// Invalid configuration value
    #[error("Invalid config value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Config directory not found
    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Error type for processing a whole document.
///
/// A document either translates completely or fails with one of these;
/// partially translated output is never returned.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// A leaf translation failed, so the document could not be reassembled
    #[error("Translation failed: {0}")]
    Translation(#[from] TranslationError),

    /// Processing options are unusable
    #[error("Invalid processing options: {0}")]
    InvalidOptions(String),
}

/// Result type alias using anyhow for application-level error handling.
pub type Result<T> = anyhow::Result<T>;
