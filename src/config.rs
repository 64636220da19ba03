//! Configuration management for epubox.
//!
//! Handles loading, saving, and validating configuration from
//! platform-specific config directories.

use crate::cost::LimitType;
use crate::error::ConfigError;
use crate::filter::SkipTagSet;
use crate::processor::ProcessOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Application name used for config directory.
const APP_NAME: &str = "epubox";

/// Default config filename.
const CONFIG_FILENAME: &str = "config.toml";

/// Placeholder value for unconfigured API keys.
const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_HERE";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Translation API configuration.
    pub api: ApiConfig,

    /// Translation behavior settings.
    pub translation: TranslationConfig,

    /// Tags kept out of translation.
    pub skip_tags: SkipTagsConfig,

    /// LLM prompts.
    pub prompts: PromptsConfig,
}

/// API configuration for an OpenAI-compatible endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API key (required unless running dry).
    pub key: String,

    /// Base URL for the API.
    pub base_url: String,

    /// Model identifier.
    pub model: String,

    /// Per-request timeout in seconds.
    pub timeout_sec: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: API_KEY_PLACEHOLDER.to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_sec: 120,
        }
    }
}

impl ApiConfig {
    /// Checks if the API key is configured (not placeholder).
    pub fn is_configured(&self) -> bool {
        !self.key.is_empty() && self.key != API_KEY_PLACEHOLDER
    }
}

/// Translation behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Language of the source documents.
    pub source_language: String,

    /// Language to translate into.
    pub target_language: String,

    /// Maximum cost of a single translation request.
    pub budget: usize,

    /// Unit the budget is measured in.
    pub limit_type: LimitType,

    /// Maximum number of requests in flight.
    pub concurrency: usize,

    /// Number of attempts for a failed request.
    pub retries: u32,

    /// Delay after each successful request in seconds.
    pub delay_between_requests_sec: f64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            source_language: "en".to_string(),
            target_language: "zh".to_string(),
            budget: 4000,
            limit_type: LimitType::Chars,
            concurrency: 3,
            retries: 3,
            delay_between_requests_sec: 0.0,
        }
    }
}

/// Skip-tag configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkipTagsConfig {
    /// Tag names skipped in addition to the built-in list.
    pub extra: Vec<String>,
}

/// LLM system prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Prompt for markup translation. `{source_lang}` and `{target_lang}`
    /// are substituted per request.
    pub translation: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            translation: "You are a professional translator. Translate the following HTML from {source_lang} to {target_lang}. Keep every tag, attribute and entity exactly as it is and translate only the human-readable text. Tokens of the form †N† are placeholders: copy them unchanged. Reply with the translated HTML only, without explanations or code fences.".to_string(),
        }
    }
}

impl Config {
    /// Returns the platform-specific config directory path.
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Returns the full path to the config file.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(CONFIG_FILENAME))
    }

    /// Loads configuration from the default location.
    ///
    /// If the config file doesn't exist, creates a default one.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            tracing::info!(path = %path.display(), "created default config");
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Saves configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Saves configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates the configuration for talking to the API.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_with_options(true)
    }

    /// Validates the configuration. The API section is only checked when
    /// `require_api` is set; dry runs never contact it.
    pub fn validate_with_options(&self, require_api: bool) -> Result<(), ConfigError> {
        if require_api {
            if !self.api.is_configured() {
                return Err(ConfigError::MissingValue(
                    "api.key (set your API key in config file)".to_string(),
                ));
            }

            Url::parse(&self.api.base_url).map_err(|e| ConfigError::InvalidValue {
                key: "api.base_url".to_string(),
                message: e.to_string(),
            })?;
        }

        if self.translation.budget == 0 {
            return Err(ConfigError::InvalidValue {
                key: "translation.budget".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if self.translation.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "translation.concurrency".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        let delay = self.translation.delay_between_requests_sec;
        if !delay.is_finite() || delay < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "translation.delay_between_requests_sec".to_string(),
                message: format!("must be a finite number of seconds >= 0, got {delay}"),
            });
        }

        if self.translation.source_language.trim().is_empty()
            || self.translation.target_language.trim().is_empty()
        {
            return Err(ConfigError::MissingValue(
                "translation.source_language / translation.target_language".to_string(),
            ));
        }

        Ok(())
    }

    /// Built-in skip tags plus the configured extras.
    pub fn skip_tag_set(&self) -> SkipTagSet {
        SkipTagSet::with_extra(&self.skip_tags.extra)
    }

    /// Processing options derived from the translation settings.
    pub fn process_options(&self) -> ProcessOptions {
        ProcessOptions {
            budget: self.translation.budget,
            concurrency: self.translation.concurrency,
            skip_tags: self.skip_tag_set(),
        }
    }
}
