//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//!
//! API keys are never stored in plain text by default: a key value of the
//! form `env:VAR_NAME` is resolved from the environment at startup, and a
//! configured-but-unresolvable key is a startup failure, not a silent
//! degradation.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AppPaths;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Validation errors surfaced before the daemon enters its event loop.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Only 16-bit PCM output is supported by the preprocessing stage.
    #[error("unsupported bit depth {0} (only 16-bit PCM is supported)")]
    UnsupportedBitDepth(u16),

    /// A zero cap would stop every recording immediately.
    #[error("max_recording_secs must be greater than zero")]
    ZeroMaxDuration,

    /// The configured push-to-talk key name is not recognised.
    #[error("unknown push-to-talk key \"{0}\"")]
    UnknownHotkey(String),

    /// An `env:VAR` API key reference points at an unset variable.
    #[error("provider \"{provider}\": API key variable {var} is not set")]
    MissingApiKey { provider: String, var: String },
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for audio capture and preprocessing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz the preprocessor converts recordings to before
    /// upload (transcription providers expect 16 000).
    pub sample_rate: u32,
    /// Bit depth of the uploaded PCM payload.  Only 16 is accepted.
    pub bit_depth: u16,
    /// Hard ceiling on recording length in seconds.  Recording is
    /// force-stopped at this bound even while the hotkey is still held.
    pub max_recording_secs: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            bit_depth: 16,
            max_recording_secs: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// HotkeyConfig
// ---------------------------------------------------------------------------

/// Global hotkey binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotkeyConfig {
    /// Push-to-talk key name (e.g. `"F9"`), parsed by
    /// [`crate::hotkey::parse_key`].
    pub push_to_talk_key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            push_to_talk_key: "F9".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProviderEndpoint
// ---------------------------------------------------------------------------

/// One remote provider endpoint (transcription or enhancement).
///
/// Nothing is hardcoded: `base_url`, `api_key` and `model` select the
/// provider, so primary and fallback can point at any OpenAI-compatible
/// service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEndpoint {
    /// Short name used in logs (e.g. `"groq"`).
    pub name: String,
    /// Base URL without the versioned path (e.g. `https://api.groq.com/openai`).
    pub base_url: String,
    /// API key, either a literal value or `env:VAR_NAME`.  `None` for
    /// unauthenticated local endpoints.
    pub api_key: Option<String>,
    /// Model identifier sent with each request.
    pub model: String,
}

impl ProviderEndpoint {
    /// Resolve the configured API key.
    ///
    /// `env:VAR_NAME` values are looked up in the environment; a missing
    /// variable is a [`ConfigError::MissingApiKey`].  Literal values and
    /// `None` pass through unchanged.
    pub fn resolve_api_key(&self) -> Result<Option<String>, ConfigError> {
        let Some(value) = &self.api_key else {
            return Ok(None);
        };
        match value.strip_prefix("env:") {
            Some(var) => std::env::var(var)
                .map(Some)
                .map_err(|_| ConfigError::MissingApiKey {
                    provider: self.name.clone(),
                    var: var.to_string(),
                }),
            None => Ok(Some(value.clone())),
        }
    }
}

// ---------------------------------------------------------------------------
// TranscriptionConfig / EnhancementConfig
// ---------------------------------------------------------------------------

/// Settings for the speech-to-text stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Endpoint tried first on every recording.
    pub primary: ProviderEndpoint,
    /// Endpoint tried once when the primary fails retryably.
    pub fallback: ProviderEndpoint,
    /// Per-call HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            primary: ProviderEndpoint {
                name: "groq".into(),
                base_url: "https://api.groq.com/openai".into(),
                api_key: Some("env:GROQ_API_KEY".into()),
                model: "whisper-large-v3-turbo".into(),
            },
            fallback: ProviderEndpoint {
                name: "openai".into(),
                base_url: "https://api.openai.com".into(),
                api_key: Some("env:OPENAI_API_KEY".into()),
                model: "whisper-1".into(),
            },
            timeout_secs: 30,
        }
    }
}

/// Settings for the transcript-enhancement stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementConfig {
    /// Endpoint tried first on every transcript.
    pub primary: ProviderEndpoint,
    /// Endpoint tried once when the primary fails retryably.
    pub fallback: ProviderEndpoint,
    /// Per-call HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Sampling temperature (0.0 – 1.0).  Lower = more deterministic.
    pub temperature: f32,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            primary: ProviderEndpoint {
                name: "groq".into(),
                base_url: "https://api.groq.com/openai".into(),
                api_key: Some("env:GROQ_API_KEY".into()),
                model: "llama-3.1-8b-instant".into(),
            },
            fallback: ProviderEndpoint {
                name: "openai".into(),
                base_url: "https://api.openai.com".into(),
                api_key: Some("env:OPENAI_API_KEY".into()),
                model: "gpt-4".into(),
            },
            timeout_secs: 30,
            temperature: 0.2,
        }
    }
}

// ---------------------------------------------------------------------------
// DeliveryConfig / StatusConfig
// ---------------------------------------------------------------------------

/// Settings for clipboard + paste delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Simulate a paste keystroke after the clipboard write.  When `false`
    /// the text is left on the clipboard only.
    pub insert_enabled: bool,
    /// Milliseconds between the clipboard write and the paste keystroke, so
    /// the clipboard manager has flushed before the target app reads it.
    pub paste_delay_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            insert_enabled: true,
            paste_delay_ms: 50,
        }
    }
}

/// Settings for the visual status indicator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Show desktop notifications on state changes.  When `false` (or when
    /// no notification surface is available) the daemon runs without visual
    /// feedback.
    pub notifications_enabled: bool,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voiceflow::config::AppConfig;
///
/// // Load (returns Default when the file is missing)
/// let config = AppConfig::load().unwrap();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Audio capture / preprocessing settings.
    pub audio: AudioConfig,
    /// Global hotkey binding.
    pub hotkey: HotkeyConfig,
    /// Transcription provider pair.
    pub transcription: TranscriptionConfig,
    /// Enhancement provider pair.
    pub enhancement: EnhancementConfig,
    /// Clipboard / paste behaviour.
    pub delivery: DeliveryConfig,
    /// Status indicator behaviour.
    pub status: StatusConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check everything the daemon needs before it starts listening.
    ///
    /// Covers the audio format constraints, the hotkey name, and resolution
    /// of all four provider API keys, so a misconfigured deployment fails at
    /// launch instead of on the first recording.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audio.bit_depth != 16 {
            return Err(ConfigError::UnsupportedBitDepth(self.audio.bit_depth));
        }
        if self.audio.max_recording_secs == 0 {
            return Err(ConfigError::ZeroMaxDuration);
        }
        if crate::hotkey::parse_key(&self.hotkey.push_to_talk_key).is_none() {
            return Err(ConfigError::UnknownHotkey(
                self.hotkey.push_to_talk_key.clone(),
            ));
        }
        for endpoint in [
            &self.transcription.primary,
            &self.transcription.fallback,
            &self.enhancement.primary,
            &self.enhancement.fallback,
        ] {
            endpoint.resolve_api_key()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
