//! Translation through OpenAI-compatible chat completion APIs.
//!
//! Retries and request pacing live here; the engine only sees the final
//! outcome of each request.

use crate::config::{ApiConfig, Config, TranslationConfig};
use crate::error::TranslationError;
use crate::translator::Translate;
use crate::utils::{check_response_status, classify_request_error};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

/// Refusal phrases that indicate the model declined to translate.
static REFUSAL_PHRASES: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    vec![
        "i'm sorry",
        "i cannot",
        "i am unable",
        "as an ai",
        "my apologies",
        "i am not programmed",
        "i do not have the ability",
    ]
});

/// Upper bound for the wait between two attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// A message in the chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role: "system", "user", or "assistant".
    pub role: String,
    /// Content of the message.
    pub content: String,
}

/// Request body for the chat completions API.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    stream: bool,
}

/// Response from the chat completions API.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Translator backed by an OpenAI-compatible endpoint.
pub struct OpenAiTranslator {
    /// HTTP client for API requests.
    client: Client,
    /// API configuration.
    api_config: ApiConfig,
    /// Attempts per request.
    retries: u32,
    /// Pause after each successful request.
    delay_between_requests: Duration,
    /// System prompt template.
    prompt: String,
}

impl OpenAiTranslator {
    /// Creates a translator. Fails if the API key is not configured.
    pub fn new(
        api_config: ApiConfig,
        translation_config: &TranslationConfig,
        prompt: impl Into<String>,
    ) -> Result<Self, TranslationError> {
        if !api_config.is_configured() {
            return Err(TranslationError::InvalidConfig(
                "api.key is not set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(api_config.timeout_sec.max(1)))
            .build()?;

        Ok(Self {
            client,
            api_config,
            retries: translation_config.retries.max(1),
            delay_between_requests: Duration::try_from_secs_f64(
                translation_config.delay_between_requests_sec,
            )
            .map_err(|e| {
                TranslationError::InvalidConfig(format!(
                    "translation.delay_between_requests_sec: {e}"
                ))
            })?,
            prompt: prompt.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, TranslationError> {
        Self::new(
            config.api.clone(),
            &config.translation,
            config.prompts.translation.clone(),
        )
    }

    /// Fills the language placeholders of the prompt template.
    fn system_prompt(&self, source_lang: &str, target_lang: &str) -> String {
        self.prompt
            .replace("{source_lang}", source_lang)
            .replace("{target_lang}", target_lang)
    }

    /// Sends one request without retrying.
    async fn request(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let request = ChatRequest {
            model: &self.api_config.model,
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: self.system_prompt(source_lang, target_lang),
                },
                Message {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
            stream: false,
        };

        let url = format!(
            "{}/chat/completions",
            self.api_config.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_config.key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(classify_request_error)?;

        let response = check_response_status(response).await?;
        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| TranslationError::ParseError(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| TranslationError::ParseError("response has no choices".to_string()))?;

        validate_response(&content)?;
        Ok(content)
    }
}

#[async_trait]
impl Translate for OpenAiTranslator {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        if source_lang.trim().is_empty() || target_lang.trim().is_empty() {
            return Err(TranslationError::InvalidLanguagePair {
                source_lang: source_lang.to_string(),
                target_lang: target_lang.to_string(),
            });
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.request(text, source_lang, target_lang).await {
                Ok(translated) => {
                    if !self.delay_between_requests.is_zero() {
                        tokio::time::sleep(self.delay_between_requests).await;
                    }
                    return Ok(translated);
                }
                Err(e) if is_retryable(&e) && attempt < self.retries => {
                    let delay = backoff_delay(attempt);
                    tracing::warn!(
                        error = %e,
                        attempt,
                        retries = self.retries,
                        ?delay,
                        "translation request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                // Contract errors keep their kind so callers can react to them.
                Err(e) if e.is_transient() || !is_retryable(&e) => return Err(e),
                Err(e) => {
                    return Err(TranslationError::RetriesExhausted {
                        attempts: attempt,
                        last: e.to_string(),
                    });
                }
            }
        }
    }
}

/// Exponential backoff: 2s, 4s, 8s... capped at [`MAX_BACKOFF`].
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt)).min(MAX_BACKOFF)
}

fn is_retryable(error: &TranslationError) -> bool {
    error.is_transient() || matches!(error, TranslationError::Refused(_))
}

/// Rejects empty answers and answers that open with a refusal.
fn validate_response(content: &str) -> Result<(), TranslationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(TranslationError::Refused("Empty response".to_string()));
    }

    let lower = trimmed.to_lowercase();
    for phrase in REFUSAL_PHRASES.iter() {
        if lower.starts_with(phrase) {
            return Err(TranslationError::Refused(format!(
                "Response starts with refusal phrase: {}",
                phrase
            )));
        }
    }
    Ok(())
}
