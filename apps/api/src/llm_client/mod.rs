/// LLM client — the single point of entry for all Claude API calls.
///
/// ARCHITECTURAL RULE: no other module may call the Anthropic API directly.
/// Transport-level failures are mapped into `ProviderErrorKind` here, once,
/// at the boundary; downstream code never inspects error strings.
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

pub mod prompts;

use crate::models::profile::CandidateProfile;
use prompts::{direct_mode_prompt, text_mode_prompt, PROFILE_EXTRACTION_SYSTEM};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
/// Response token budget. The profile JSON fits comfortably within this.
const MAX_TOKENS: u32 = 2000;
/// Low temperature to favor deterministic, schema-conforming output.
const TEMPERATURE: f32 = 0.3;

/// Provider failure taxonomy. Every class is absorbed identically by the
/// orchestrator's heuristic fallback; the distinction exists for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    QuotaExhausted,
    RateLimited,
    ModelNotFound,
    InvalidDocument,
    Other,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider error ({kind:?}): {message}")]
    Provider {
        kind: ProviderErrorKind,
        message: String,
    },

    #[error("model response is not valid JSON: {0}")]
    InvalidResponseFormat(String),

    #[error("model response violates the profile schema: {0}")]
    SchemaValidation(String),

    #[error("model returned empty content")]
    EmptyContent,
}

/// Strategy seam for profile extraction. The orchestrator holds this as an
/// `Arc<dyn ProfileExtractor>`, so tests can substitute scripted doubles and
/// deployments can swap providers without touching the pipeline.
#[async_trait]
pub trait ProfileExtractor: Send + Sync {
    /// Text mode: analyze already-extracted plain text.
    async fn extract_from_text(&self, cv_text: &str) -> Result<CandidateProfile, LlmError>;

    /// Direct-document mode: analyze the raw PDF bytes natively.
    async fn extract_from_pdf(&self, bytes: &[u8]) -> Result<CandidateProfile, LlmError>;

    /// Fixed identifier combining provider and model, stored on every record.
    fn model_version(&self) -> String;
}

// ── Anthropic wire types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentPart<'a> {
    Text { text: &'a str },
    Document { source: DocumentSource<'a> },
}

#[derive(Debug, Serialize)]
struct DocumentSource<'a> {
    #[serde(rename = "type")]
    source_type: &'a str,
    media_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    #[serde(rename = "type", default)]
    error_type: String,
    message: String,
}

// ── Claude-backed extractor ─────────────────────────────────────────────────

/// Profile extractor backed by the Anthropic Messages API. Single attempt per
/// call; the orchestrator owns the fallback decision.
#[derive(Clone)]
pub struct ClaudeExtractor {
    client: Client,
    api_key: String,
    model: String,
}

impl ClaudeExtractor {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            model,
        }
    }

    async fn call(&self, content: Vec<ContentPart<'_>>) -> Result<String, LlmError> {
        let request_body = AnthropicRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system: PROFILE_EXTRACTION_SYSTEM,
            messages: vec![AnthropicMessage {
                role: "user",
                content,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (error_type, message) = match serde_json::from_str::<AnthropicError>(&body) {
                Ok(parsed) => (parsed.error.error_type, parsed.error.message),
                Err(_) => (String::new(), body),
            };
            let kind = classify_api_error(status.as_u16(), &error_type, &message);
            error!(status = status.as_u16(), ?kind, "Anthropic API call failed: {message}");
            return Err(LlmError::Provider { kind, message });
        }

        let parsed: AnthropicResponse = response.json().await?;
        debug!(
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "Anthropic call succeeded"
        );

        parsed
            .content
            .iter()
            .find(|block| block.block_type == "text")
            .and_then(|block| block.text.clone())
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}

#[async_trait]
impl ProfileExtractor for ClaudeExtractor {
    async fn extract_from_text(&self, cv_text: &str) -> Result<CandidateProfile, LlmError> {
        let prompt = text_mode_prompt(cv_text);
        let raw = self
            .call(vec![ContentPart::Text { text: &prompt }])
            .await?;
        parse_profile_response(&raw)
    }

    async fn extract_from_pdf(&self, bytes: &[u8]) -> Result<CandidateProfile, LlmError> {
        let prompt = direct_mode_prompt();
        let encoded = BASE64.encode(bytes);
        let raw = self
            .call(vec![
                ContentPart::Text { text: &prompt },
                ContentPart::Document {
                    source: DocumentSource {
                        source_type: "base64",
                        media_type: "application/pdf",
                        data: &encoded,
                    },
                },
            ])
            .await?;
        parse_profile_response(&raw)
    }

    fn model_version(&self) -> String {
        format!("anthropic-{}-v1.0", self.model)
    }
}

/// Fixed identifier reported when no extractor instance exists to ask.
/// Records carry a provenance tag, so this never has to encode "fallback".
pub fn default_model_version() -> String {
    format!("anthropic-{DEFAULT_MODEL}-v1.0")
}

/// Maps an Anthropic API failure into the typed taxonomy. Matching on the
/// structured `error.type` field plus HTTP status; the one free-text check
/// (credit balance) is how the provider reports exhausted quota.
fn classify_api_error(status: u16, error_type: &str, message: &str) -> ProviderErrorKind {
    let message_lower = message.to_lowercase();
    match error_type {
        "rate_limit_error" => ProviderErrorKind::RateLimited,
        "not_found_error" => ProviderErrorKind::ModelNotFound,
        "invalid_request_error" if message_lower.contains("credit balance") => {
            ProviderErrorKind::QuotaExhausted
        }
        "invalid_request_error"
            if message_lower.contains("document") || message_lower.contains("pdf") =>
        {
            ProviderErrorKind::InvalidDocument
        }
        _ if status == 429 => ProviderErrorKind::RateLimited,
        _ => ProviderErrorKind::Other,
    }
}

/// Parses model output into a validated profile, distinguishing "not JSON at
/// all" from "JSON that violates the schema" — the orchestrator logs them
/// differently, though both degrade to the heuristic.
pub fn parse_profile_response(raw: &str) -> Result<CandidateProfile, LlmError> {
    let text = strip_json_fences(raw);

    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| LlmError::InvalidResponseFormat(e.to_string()))?;

    let profile: CandidateProfile = serde_json::from_value(value)
        .map_err(|e| LlmError::SchemaValidation(e.to_string()))?;

    profile.validate().map_err(LlmError::SchemaValidation)?;
    Ok(profile)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
