//! Error types for the AI search client.
//!
//! Failures are normalized into a small fixed set of categories, each with
//! a stable human-readable message for display. The underlying cause is
//! always logged at the call site; only `user_message` reaches the screen.

use thiserror::Error;

/// Errors that can occur when running an AI-assisted search.
#[derive(Debug, Error)]
pub enum AiSearchError {
    /// No model configured; AI search is switched off.
    #[error("AI search is not configured")]
    NotConfigured,

    /// A model is configured but its API key is missing.
    #[error("AI API key is missing")]
    MissingKey,

    /// The configured model name matches no known backend.
    #[error("unsupported model: {0}")]
    UnsupportedModel(String),

    /// HTTP request failed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Rate limited by the API.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The model's answer could not be parsed into a search result.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Authentication failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Anything else the API returned.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl AiSearchError {
    /// The message shown to the person searching. Deliberately free of
    /// technical detail; the cause goes to the log instead.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::NotConfigured => "Smart search is not set up yet.",
            Self::MissingKey => "Smart search is missing its access key.",
            Self::UnsupportedModel(_) => "Smart search is set up with an unknown model.",
            Self::Network(_) => "Could not reach the search service. Check your connection.",
            Self::RateLimited(_) => "Too many searches right now. Try again in a moment.",
            Self::MalformedResponse(_) => "The search service gave an unusable answer. Try again.",
            Self::Unauthorized(_) => "The search service rejected our access key.",
            Self::Unknown(_) => "Something went wrong with smart search. Try again.",
        }
    }
}

/// Error body shape shared by both backends' APIs.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

/// Nested error details.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AiSearchError::RateLimited(60);
        assert_eq!(err.to_string(), "rate limited, retry after 60 seconds");

        let err = AiSearchError::UnsupportedModel("gpt-42".to_string());
        assert_eq!(err.to_string(), "unsupported model: gpt-42");
    }

    #[test]
    fn test_every_category_has_a_user_message() {
        let messages = [
            AiSearchError::NotConfigured.user_message(),
            AiSearchError::MissingKey.user_message(),
            AiSearchError::UnsupportedModel(String::new()).user_message(),
            AiSearchError::RateLimited(1).user_message(),
            AiSearchError::MalformedResponse(String::new()).user_message(),
            AiSearchError::Unauthorized(String::new()).user_message(),
            AiSearchError::Unknown(String::new()).user_message(),
        ];

        for message in messages {
            assert!(!message.is_empty());
        }
    }

    #[test]
    fn test_api_error_deserialization() {
        let json = r#"{ "error": { "message": "quota exceeded", "code": 429 } }"#;
        let response: ApiErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.error.message, "quota exceeded");
    }
}
