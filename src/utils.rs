//! Utility functions for common operations.

use crate::error::TranslationError;
use reqwest::StatusCode;

/// Checks if an HTTP response is successful, and if not, returns a detailed error.
///
/// This helper extracts both the status code and response body for better error messages.
pub async fn check_response_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, TranslationError> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(status_error(status, &text));
    }
    Ok(response)
}

/// Maps a failed HTTP status to the matching translation error.
pub fn status_error(status: StatusCode, body: &str) -> TranslationError {
    let message = format!("HTTP {}: {}", status, body);
    match status {
        StatusCode::TOO_MANY_REQUESTS => TranslationError::RateLimitExceeded(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            TranslationError::Timeout(message)
        }
        s if s.is_server_error() => TranslationError::BackendUnavailable(message),
        _ => TranslationError::ApiError(message),
    }
}

/// Maps a transport error to the matching translation error.
pub fn classify_request_error(error: reqwest::Error) -> TranslationError {
    if error.is_timeout() {
        TranslationError::Timeout(error.to_string())
    } else if error.is_connect() {
        TranslationError::BackendUnavailable(error.to_string())
    } else {
        TranslationError::HttpError(error)
    }
}

/// Shortens `text` to at most `max_chars` characters for display.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    if flat.chars().count() > max_chars {
        let head: String = flat.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        flat
    }
}
