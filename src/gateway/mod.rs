//! Remote provider gateways and the shared two-tier fallback protocol.
//!
//! Both pipeline stages that leave the machine — transcription and
//! enhancement — follow the same calling convention:
//!
//! 1. Call the primary provider with a bounded timeout.
//! 2. `Success` → done, tagged [`ProviderTier::Primary`].
//! 3. `Retryable` (timeout, rate limit, transient network/server error) →
//!    call the fallback provider once.
//! 4. `Fatal` (unrecoverable input such as an empty payload) → surface
//!    immediately; the same input would fail on any provider.
//! 5. Fallback failure of either kind → error carrying both reasons.
//!
//! There is no retry beyond the single fallback hop, which bounds the
//! worst case to roughly twice one provider's timeout.  Selection is not
//! sticky: every invocation starts at the primary.

pub mod enhance;
pub mod transcribe;

pub use enhance::{EnhancedResult, Enhancement, EnhancementGateway, EnhancementProvider, HttpEnhancer};
pub use transcribe::{
    HttpTranscriber, Transcription, TranscriptionGateway, TranscriptionProvider, TranscriptResult,
};

use std::future::Future;

use thiserror::Error;

// ---------------------------------------------------------------------------
// ProviderTier / ProviderOutcome
// ---------------------------------------------------------------------------

/// Which tier of the provider pair produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderTier {
    Primary,
    Fallback,
}

impl ProviderTier {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for ProviderTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified result of a single provider call.
///
/// Providers never return raw transport errors; they classify every failure
/// so the fallback loop can decide between "try the other tier" and "give
/// up now".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome<T> {
    /// The call produced a usable payload.
    Success(T),
    /// Transient failure — the fallback tier may succeed.
    Retryable(String),
    /// The input itself is unacceptable — no tier can succeed.
    Fatal(String),
}

// ---------------------------------------------------------------------------
// GatewayError
// ---------------------------------------------------------------------------

/// Terminal failure of a gateway invocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// A provider classified the input as unrecoverable; the fallback tier
    /// was (correctly) never consulted.
    #[error("provider rejected the request: {0}")]
    Fatal(String),

    /// Primary failed retryably and the fallback failed too.
    #[error("primary failed ({primary}); fallback failed ({fallback})")]
    BothFailed { primary: String, fallback: String },
}

// ---------------------------------------------------------------------------
// with_fallback
// ---------------------------------------------------------------------------

/// Run the two-tier fallback protocol over `call`.
///
/// `call` is invoked with [`ProviderTier::Primary`] first and, only when
/// that returns [`ProviderOutcome::Retryable`], once more with
/// [`ProviderTier::Fallback`].  The fixed-arity loop is the entire retry
/// policy — there is deliberately nothing open-ended here.
pub async fn with_fallback<T, F, Fut>(mut call: F) -> Result<(T, ProviderTier), GatewayError>
where
    F: FnMut(ProviderTier) -> Fut,
    Fut: Future<Output = ProviderOutcome<T>>,
{
    let primary_reason = match call(ProviderTier::Primary).await {
        ProviderOutcome::Success(value) => return Ok((value, ProviderTier::Primary)),
        ProviderOutcome::Fatal(reason) => return Err(GatewayError::Fatal(reason)),
        ProviderOutcome::Retryable(reason) => reason,
    };

    log::warn!("primary provider failed ({primary_reason}); trying fallback");

    match call(ProviderTier::Fallback).await {
        ProviderOutcome::Success(value) => Ok((value, ProviderTier::Fallback)),
        ProviderOutcome::Retryable(reason) | ProviderOutcome::Fatal(reason) => {
            Err(GatewayError::BothFailed {
                primary: primary_reason,
                fallback: reason,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP classification helpers (shared by both gateways)
// ---------------------------------------------------------------------------

/// Classify an HTTP status + response body into a failure outcome.
///
/// Rate limiting, timeouts and server-side errors are worth a fallback
/// attempt.  Statuses that indict the payload itself (bad request, payload
/// too large, unsupported media, unprocessable) are final.  Everything else
/// — including auth failures, since the fallback endpoint carries its own
/// credentials — is treated as retryable.
pub(crate) fn classify_http_failure<T>(
    status: reqwest::StatusCode,
    body: &str,
) -> ProviderOutcome<T> {
    let reason = format!("HTTP {}: {}", status.as_u16(), truncate(body, 200));
    match status.as_u16() {
        400 | 413 | 415 | 422 => ProviderOutcome::Fatal(reason),
        _ => ProviderOutcome::Retryable(reason),
    }
}

/// Classify a reqwest transport error.  Transport problems never indict the
/// payload, so they are always retryable.
pub(crate) fn classify_transport_error<T>(err: &reqwest::Error) -> ProviderOutcome<T> {
    let reason = if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        format!("request failed: {err}")
    };
    ProviderOutcome::Retryable(reason)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
