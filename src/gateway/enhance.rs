//! Transcript enhancement gateway — `EnhancementProvider` trait, the
//! OpenAI-compatible chat-completions implementation, and the two-tier
//! [`EnhancementGateway`].
//!
//! Enhancement turns a raw spoken-word transcript into written-form text:
//! grammar, spelling and capitalisation fixed, nothing added.  The prompt
//! pins the model to exactly that, and the gateway appends a trailing
//! newline when the result spans multiple sentences so pasted paragraphs
//! end cleanly.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{ConfigError, ProviderEndpoint};
use crate::gateway::{
    classify_http_failure, classify_transport_error, with_fallback, GatewayError, ProviderOutcome,
    ProviderTier,
};

// ---------------------------------------------------------------------------
// EnhancedResult
// ---------------------------------------------------------------------------

/// Final text artifact of the pipeline, tagged with where it came from.
#[derive(Debug, Clone)]
pub struct EnhancedResult {
    /// Cleaned-up text, ready for delivery.
    pub text: String,
    /// Which tier produced it.
    pub provider: ProviderTier,
}

// ---------------------------------------------------------------------------
// EnhancementProvider trait
// ---------------------------------------------------------------------------

/// One enhancement endpoint.
#[async_trait]
pub trait EnhancementProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Clean up the transcript.
    async fn enhance(&self, transcript: &str) -> ProviderOutcome<String>;
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

const SYSTEM_MESSAGE: &str = "You are a helpful assistant that improves transcriptions.";

/// Build the cleanup instruction wrapping the transcript.
fn cleanup_prompt(transcript: &str) -> String {
    format!(
        "For the given transcription with unclear and incorrect grammar, spelling and \
         capitalization, return a cleaned text that is the exact representation of the \
         transcript but in a written form with correct grammar, spelling, capitalization, \
         etc. Do not add any additional text or comments. Do not give me multiple options. \
         ONLY output the cleaned text. <TRANSCRIPT>{transcript}</TRANSCRIPT>"
    )
}

// ---------------------------------------------------------------------------
// HttpEnhancer
// ---------------------------------------------------------------------------

/// OpenAI-compatible `/v1/chat/completions` client.
///
/// Works with any provider that speaks the chat-completions wire format;
/// `base_url`, `api_key` and `model` come exclusively from the endpoint
/// definition.
pub struct HttpEnhancer {
    client: reqwest::Client,
    name: String,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl HttpEnhancer {
    /// Build an enhancer from an endpoint definition.
    pub fn from_endpoint(
        endpoint: &ProviderEndpoint,
        timeout: std::time::Duration,
        temperature: f32,
    ) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Ok(Self {
            client,
            name: endpoint.name.clone(),
            base_url: endpoint.base_url.trim_end_matches('/').to_string(),
            api_key: endpoint.resolve_api_key()?,
            model: endpoint.model.clone(),
            temperature,
        })
    }
}

#[async_trait]
impl EnhancementProvider for HttpEnhancer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn enhance(&self, transcript: &str) -> ProviderOutcome<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_MESSAGE },
                { "role": "user",   "content": cleanup_prompt(transcript) }
            ],
            "stream": false,
            "temperature": self.temperature,
        });

        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut req = self.client.post(&url).json(&body);

        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            req = req.bearer_auth(key);
        }

        let response = match req.send().await {
            Ok(resp) => resp,
            Err(e) => return classify_transport_error(&e),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return classify_http_failure(status, &body);
        }

        let json: serde_json::Value = match response.json().await {
            Ok(json) => json,
            Err(e) => return ProviderOutcome::Retryable(format!("unparseable response: {e}")),
        };

        match json["choices"][0]["message"]["content"].as_str() {
            Some(content) if !content.trim().is_empty() => {
                ProviderOutcome::Success(content.trim().to_string())
            }
            // The fallback model may produce actual content.
            _ => ProviderOutcome::Retryable("empty completion".into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Enhancement trait + EnhancementGateway
// ---------------------------------------------------------------------------

/// The enhancement stage as the pipeline sees it.
#[async_trait]
pub trait Enhancement: Send + Sync {
    /// Clean up `transcript` and return the delivery-ready text.
    async fn enhance(&self, transcript: &str) -> Result<EnhancedResult, GatewayError>;
}

/// Primary/fallback pair implementing the shared fallback protocol for
/// transcript enhancement.
pub struct EnhancementGateway {
    primary: Arc<dyn EnhancementProvider>,
    fallback: Arc<dyn EnhancementProvider>,
}

impl EnhancementGateway {
    pub fn new(
        primary: Arc<dyn EnhancementProvider>,
        fallback: Arc<dyn EnhancementProvider>,
    ) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl Enhancement for EnhancementGateway {
    async fn enhance(&self, transcript: &str) -> Result<EnhancedResult, GatewayError> {
        let (text, provider) = with_fallback(|tier| {
            let provider = match tier {
                ProviderTier::Primary => &self.primary,
                ProviderTier::Fallback => &self.fallback,
            };
            log::debug!("enhancing transcript via {} provider \"{}\"", tier, provider.name());
            provider.enhance(transcript)
        })
        .await?;

        Ok(EnhancedResult {
            text: finalize_text(&text),
            provider,
        })
    }
}

// ---------------------------------------------------------------------------
// finalize_text
// ---------------------------------------------------------------------------

/// Append a trailing newline when `text` spans more than one sentence, so a
/// pasted paragraph ends on its own line.  Single sentences pass through
/// unchanged.
fn finalize_text(text: &str) -> String {
    if has_multiple_sentences(text) {
        format!("{text}\n")
    } else {
        text.to_string()
    }
}

/// A sentence boundary is a `.`, `!` or `?` followed by whitespace and then
/// more content.
fn has_multiple_sentences(text: &str) -> bool {
    let trimmed = text.trim();
    let mut chars = trimmed.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(_, next)) = chars.peek() {
                let rest = &trimmed[idx + c.len_utf8()..];
                if next.is_whitespace() && !rest.trim_start().is_empty() {
                    return true;
                }
            }
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
