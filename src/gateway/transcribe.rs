//! Speech-to-text gateway — `TranscriptionProvider` trait, the
//! OpenAI-compatible HTTP implementation, and the two-tier
//! [`TranscriptionGateway`].
//!
//! `HttpTranscriber` posts the WAV payload to any endpoint that speaks the
//! `POST {base}/v1/audio/transcriptions` multipart protocol — Groq, OpenAI,
//! and self-hosted Whisper servers all do.  All connection details come from
//! [`ProviderEndpoint`]; nothing is hardcoded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;

use crate::audio::AudioBlob;
use crate::config::{ConfigError, ProviderEndpoint};
use crate::gateway::{
    classify_http_failure, classify_transport_error, with_fallback, GatewayError, ProviderOutcome,
    ProviderTier,
};

// ---------------------------------------------------------------------------
// TranscriptResult
// ---------------------------------------------------------------------------

/// Output of a successful transcription, tagged with where it came from.
#[derive(Debug, Clone)]
pub struct TranscriptResult {
    /// Raw transcript text.
    pub text: String,
    /// Which tier produced it.
    pub provider: ProviderTier,
    /// Wall-clock time spent in the gateway, fallback hop included.
    pub latency: Duration,
}

// ---------------------------------------------------------------------------
// TranscriptionProvider trait
// ---------------------------------------------------------------------------

/// One transcription endpoint.
///
/// Implementors classify their own failures into [`ProviderOutcome`] — the
/// gateway only decides whether to consult the other tier.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Transcribe the audio payload.
    async fn transcribe(&self, audio: &AudioBlob) -> ProviderOutcome<String>;
}

// ---------------------------------------------------------------------------
// HttpTranscriber
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// OpenAI-compatible `/v1/audio/transcriptions` client.
pub struct HttpTranscriber {
    client: reqwest::Client,
    name: String,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpTranscriber {
    /// Build a transcriber from an endpoint definition.
    ///
    /// The HTTP client carries the per-call `timeout`; the API key is
    /// resolved here so a bad `env:` reference fails at startup.
    pub fn from_endpoint(
        endpoint: &ProviderEndpoint,
        timeout: Duration,
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
        })
    }
}

#[async_trait]
impl TranscriptionProvider for HttpTranscriber {
    fn name(&self) -> &str {
        &self.name
    }

    /// Upload `audio` as a multipart form and return the transcript.
    ///
    /// An empty payload is rejected before any network traffic: no provider
    /// can transcribe zero frames, so the outcome is `Fatal` and the
    /// fallback tier is skipped.
    async fn transcribe(&self, audio: &AudioBlob) -> ProviderOutcome<String> {
        if audio.is_empty() {
            return ProviderOutcome::Fatal("empty audio payload".into());
        }

        let part = match reqwest::multipart::Part::bytes(audio.bytes.clone())
            .file_name("recording.wav")
            .mime_str("audio/wav")
        {
            Ok(part) => part,
            // Same code path on the fallback tier, so retrying cannot help.
            Err(e) => return ProviderOutcome::Fatal(format!("cannot build upload: {e}")),
        };

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "json");

        let url = format!("{}/v1/audio/transcriptions", self.base_url);
        let mut req = self.client.post(&url).multipart(form);

        // Attach the Authorization header only when a key is configured.
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

        match response.json::<TranscriptionResponse>().await {
            Ok(parsed) => ProviderOutcome::Success(parsed.text.trim().to_string()),
            Err(e) => ProviderOutcome::Retryable(format!("unexpected response shape: {e}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Transcription trait + TranscriptionGateway
// ---------------------------------------------------------------------------

/// The transcription stage as the pipeline sees it.
#[async_trait]
pub trait Transcription: Send + Sync {
    /// Transcribe `audio`, consuming it.
    async fn transcribe(&self, audio: AudioBlob) -> Result<TranscriptResult, GatewayError>;
}

/// Primary/fallback pair implementing the shared fallback protocol for
/// speech-to-text.
pub struct TranscriptionGateway {
    primary: Arc<dyn TranscriptionProvider>,
    fallback: Arc<dyn TranscriptionProvider>,
}

impl TranscriptionGateway {
    pub fn new(
        primary: Arc<dyn TranscriptionProvider>,
        fallback: Arc<dyn TranscriptionProvider>,
    ) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl Transcription for TranscriptionGateway {
    async fn transcribe(&self, audio: AudioBlob) -> Result<TranscriptResult, GatewayError> {
        let started = Instant::now();

        let (text, provider) = with_fallback(|tier| {
            let provider = match tier {
                ProviderTier::Primary => &self.primary,
                ProviderTier::Fallback => &self.fallback,
            };
            log::debug!(
                "transcribing {:.2}s of audio via {} provider \"{}\"",
                audio.duration_secs(),
                tier,
                provider.name()
            );
            provider.transcribe(&audio)
        })
        .await?;

        Ok(TranscriptResult {
            text,
            provider,
            latency: started.elapsed(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
