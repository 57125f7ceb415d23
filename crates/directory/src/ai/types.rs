//! Types for the AI search backends.
//!
//! The request/response shapes match the Generative Language API and the
//! Anthropic Messages API respectively; both backends are asked to answer
//! with the same strict JSON object, parsed into [`AiSearchResult`].

use serde::{Deserialize, Serialize};

use hamlet_core::BusinessId;

// =============================================================================
// Domain result
// =============================================================================

/// A structured answer to a free-text query over the business snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiSearchResult {
    /// One-paragraph summary for display above the matches.
    pub summary: String,
    /// Matched businesses and free-text remarks, in the model's order.
    pub matches: Vec<AiMatch>,
}

impl AiSearchResult {
    /// How many matches reference an actual business record.
    #[must_use]
    pub fn business_match_count(&self) -> usize {
        self.matches
            .iter()
            .filter(|m| matches!(m, AiMatch::Business(_)))
            .count()
    }
}

/// One entry in the model's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiMatch {
    /// A reference to a business record.
    Business(BusinessId),
    /// Free text the model wanted to say instead.
    Text(String),
}

/// The strict JSON object both backends are instructed to answer with.
#[derive(Debug, Deserialize)]
pub struct AiAnswer {
    pub summary: String,
    #[serde(default)]
    pub matches: Vec<AiAnswerMatch>,
}

/// One element of the answer's `matches` array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AiAnswerMatch {
    Business { business_id: String },
    Text { text: String },
}

impl From<AiAnswer> for AiSearchResult {
    fn from(answer: AiAnswer) -> Self {
        Self {
            summary: answer.summary,
            matches: answer
                .matches
                .into_iter()
                .map(|m| match m {
                    AiAnswerMatch::Business { business_id } => {
                        AiMatch::Business(BusinessId::new(business_id))
                    }
                    AiAnswerMatch::Text { text } => AiMatch::Text(text),
                })
                .collect(),
        }
    }
}

// =============================================================================
// Generative Language API wire types
// =============================================================================

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Serialize)]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiContent {
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    pub text: String,
}

/// Response body for `models/{model}:generateContent`.
#[derive(Debug, Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiCandidate {
    pub content: GeminiContent,
}

impl GeminiResponse {
    /// The first text part of the first candidate, if any.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content
            .parts
            .into_iter()
            .next()
            .map(|part| part.text)
    }
}

// =============================================================================
// Anthropic Messages API wire types
// =============================================================================

/// A message in a Messages API conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ClaudeMessage {
    /// The role of the message sender ("user" or "assistant").
    pub role: String,
    /// Plain text content.
    pub content: String,
}

/// Request body for the Messages API.
#[derive(Debug, Serialize)]
pub struct ClaudeRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

/// Response from the Messages API.
#[derive(Debug, Deserialize)]
pub struct ClaudeResponse {
    pub content: Vec<ClaudeContentBlock>,
}

/// A content block within a Messages API response.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClaudeContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

impl ClaudeResponse {
    /// The first text block, if any.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        self.content.into_iter().find_map(|block| match block {
            ClaudeContentBlock::Text { text } => Some(text),
            ClaudeContentBlock::Other => None,
        })
    }
}
