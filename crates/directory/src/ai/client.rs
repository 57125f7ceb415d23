//! AI search client for natural-language queries over the directory.
//!
//! Two backends are supported, selected by the configured model name:
//! `gemini-*` goes to the Generative Language API, `claude-*` to the
//! Anthropic Messages API. Both are asked the same way: the full business
//! snapshot plus the visitor's question, with instructions to answer in a
//! strict JSON object.

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};

use hamlet_core::Business;

use crate::config::AiConfig;

use super::error::{AiSearchError, ApiErrorResponse};
use super::types::{
    AiAnswer, AiSearchResult, ClaudeMessage, ClaudeRequest, ClaudeResponse, GeminiContent,
    GeminiPart, GeminiRequest, GeminiResponse,
};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Which API a model name routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Gemini,
    Claude,
}

fn backend_for(model: &str) -> Option<Backend> {
    if model.starts_with("gemini") {
        Some(Backend::Gemini)
    } else if model.starts_with("claude") {
        Some(Backend::Claude)
    } else {
        None
    }
}

/// AI search client.
///
/// Cheaply cloneable via `Arc`. Construction validates the configuration;
/// a missing model or key is reported up front rather than on first search.
#[derive(Clone)]
pub struct AiSearchClient {
    inner: Arc<AiClientInner>,
}

struct AiClientInner {
    client: reqwest::Client,
    model: String,
    api_key: SecretString,
    backend: Backend,
}

impl AiSearchClient {
    /// Create a new AI search client.
    ///
    /// # Errors
    ///
    /// - `NotConfigured` when no model is set
    /// - `MissingKey` when the model has no API key
    /// - `UnsupportedModel` when the model name matches no backend
    pub fn new(config: &AiConfig) -> Result<Self, AiSearchError> {
        let model = config
            .model
            .clone()
            .ok_or(AiSearchError::NotConfigured)?;
        let api_key = config.api_key.clone().ok_or(AiSearchError::MissingKey)?;
        if api_key.expose_secret().is_empty() {
            return Err(AiSearchError::MissingKey);
        }
        let backend =
            backend_for(&model).ok_or_else(|| AiSearchError::UnsupportedModel(model.clone()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if backend == Backend::Claude {
            headers.insert(
                "x-api-key",
                HeaderValue::from_str(api_key.expose_secret())
                    .map_err(|_| AiSearchError::MissingKey)?,
            );
            headers.insert(
                "anthropic-version",
                HeaderValue::from_static(ANTHROPIC_VERSION),
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(AiClientInner {
                client,
                model,
                api_key,
                backend,
            }),
        })
    }

    /// Ask the configured model to answer `query` over the business
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns a classified [`AiSearchError`]; use
    /// [`AiSearchError::user_message`] for display.
    #[instrument(skip(self, businesses), fields(model = %self.inner.model))]
    pub async fn search(
        &self,
        query: &str,
        businesses: &[Business],
    ) -> Result<AiSearchResult, AiSearchError> {
        let prompt = build_prompt(query, businesses)?;

        let text = match self.inner.backend {
            Backend::Gemini => self.generate_gemini(prompt).await?,
            Backend::Claude => self.generate_claude(prompt).await?,
        };

        debug!(chars = text.len(), "model answered");
        parse_answer(&text)
    }

    async fn generate_gemini(&self, prompt: String) -> Result<String, AiSearchError> {
        let url = format!(
            "{GEMINI_API_URL}/{}:generateContent?key={}",
            self.inner.model,
            self.inner.api_key.expose_secret()
        );
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        let response = self.inner.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_failure(status, response).await);
        }

        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AiSearchError::MalformedResponse(e.to_string()))?;
        body.into_text()
            .ok_or_else(|| AiSearchError::MalformedResponse("no candidates".to_string()))
    }

    async fn generate_claude(&self, prompt: String) -> Result<String, AiSearchError> {
        let request = ClaudeRequest {
            model: self.inner.model.clone(),
            max_tokens: DEFAULT_MAX_TOKENS,
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            system: None,
        };

        let response = self
            .inner
            .client
            .post(ANTHROPIC_API_URL)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_failure(status, response).await);
        }

        let body: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| AiSearchError::MalformedResponse(e.to_string()))?;
        body.into_text()
            .ok_or_else(|| AiSearchError::MalformedResponse("no text block".to_string()))
    }
}

/// Classify an error status into one of the fixed failure categories.
async fn classify_failure(status: StatusCode, response: reqwest::Response) -> AiSearchError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        return AiSearchError::RateLimited(retry_after);
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return AiSearchError::Unauthorized("API key rejected".to_string());
    }

    match response.text().await {
        Ok(body) => {
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map_or_else(|_| body.chars().take(200).collect(), |e| e.error.message);
            AiSearchError::Unknown(message)
        }
        Err(e) => AiSearchError::Network(e),
    }
}

/// Build the single-turn prompt: instructions, snapshot, question.
fn build_prompt(query: &str, businesses: &[Business]) -> Result<String, AiSearchError> {
    let snapshot = serde_json::to_string(businesses)
        .map_err(|e| AiSearchError::Unknown(format!("snapshot serialization failed: {e}")))?;

    Ok(format!(
        "You help visitors find businesses in a village directory. \
         Answer the question using ONLY the businesses listed below.\n\
         Respond with a single JSON object, no prose around it, shaped as:\n\
         {{\"summary\": \"<one short paragraph>\", \"matches\": \
         [{{\"business_id\": \"<id>\"}} or {{\"text\": \"<remark>\"}}]}}\n\n\
         Businesses:\n{snapshot}\n\nQuestion: {query}"
    ))
}

/// Parse the model's answer, tolerating a fenced code block around the JSON.
fn parse_answer(text: &str) -> Result<AiSearchResult, AiSearchError> {
    let stripped = strip_code_fences(text);
    let answer: AiAnswer = serde_json::from_str(stripped)
        .map_err(|e| AiSearchError::MalformedResponse(e.to_string()))?;

    Ok(answer.into())
}

/// Remove a surrounding ``` fence (with optional language tag) if present.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return trimmed;
    };

    // Drop a language tag like `json` on the opening fence line.
    match inner.split_once('\n') {
        Some((first_line, rest)) if !first_line.trim().is_empty() => rest.trim(),
        _ => inner.trim(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ai::types::AiMatch;

    #[test]
    fn test_backend_dispatch_by_model_name() {
        assert_eq!(backend_for("gemini-2.0-flash"), Some(Backend::Gemini));
        assert_eq!(backend_for("claude-sonnet-4-20250514"), Some(Backend::Claude));
        assert_eq!(backend_for("gpt-4o"), None);
        assert_eq!(backend_for(""), None);
    }

    #[test]
    fn test_new_without_model_is_not_configured() {
        let config = AiConfig {
            model: None,
            api_key: Some(SecretString::from("key")),
        };
        assert!(matches!(
            AiSearchClient::new(&config),
            Err(AiSearchError::NotConfigured)
        ));
    }

    #[test]
    fn test_new_without_key_is_missing_key() {
        let config = AiConfig {
            model: Some("gemini-2.0-flash".to_string()),
            api_key: None,
        };
        assert!(matches!(
            AiSearchClient::new(&config),
            Err(AiSearchError::MissingKey)
        ));
    }

    #[test]
    fn test_new_with_unknown_model_is_unsupported() {
        let config = AiConfig {
            model: Some("gpt-4o".to_string()),
            api_key: Some(SecretString::from("key")),
        };
        assert!(matches!(
            AiSearchClient::new(&config),
            Err(AiSearchError::UnsupportedModel(_))
        ));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  ```json\n{\"a\":1}\n```  "), "{\"a\":1}");
        // An unterminated fence is left alone
        assert_eq!(strip_code_fences("```json\n{\"a\":1}"), "```json\n{\"a\":1}");
    }

    #[test]
    fn test_parse_answer_plain_json() {
        let result = parse_answer(
            r#"{"summary": "One match.", "matches": [{"business_id": "b1"}]}"#,
        )
        .unwrap();

        assert_eq!(result.summary, "One match.");
        assert_eq!(result.matches.len(), 1);
        assert!(matches!(
            result.matches.first(),
            Some(AiMatch::Business(id)) if id.as_str() == "b1"
        ));
    }

    #[test]
    fn test_parse_answer_fenced_json() {
        let text = "```json\n{\"summary\": \"ok\", \"matches\": []}\n```";
        let result = parse_answer(text).unwrap();
        assert_eq!(result.summary, "ok");
    }

    #[test]
    fn test_parse_answer_prose_is_malformed() {
        let result = parse_answer("I could not find anything, sorry!");
        assert!(matches!(result, Err(AiSearchError::MalformedResponse(_))));
    }

    #[test]
    fn test_prompt_contains_snapshot_and_query() {
        let businesses = vec![Business {
            id: hamlet_core::BusinessId::new("b1"),
            category_id: hamlet_core::CategoryId::new("c1"),
            shop_name: "Lakshmi Stores".to_string(),
            owner_name: "Lakshmi".to_string(),
            phone: "123".to_string(),
            address: None,
            hours: None,
            services: vec![],
            home_delivery: false,
            payment_options: vec![],
        }];

        let prompt = build_prompt("who sells milk?", &businesses).unwrap();
        assert!(prompt.contains("Lakshmi Stores"));
        assert!(prompt.contains("who sells milk?"));
        assert!(prompt.contains("\"summary\""));
    }
}
