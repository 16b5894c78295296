//! Configuration module for VoiceFlow.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for cross-platform data directories, TOML persistence via
//! `AppConfig::load` / `AppConfig::save`, and startup validation via
//! `AppConfig::validate`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, AudioConfig, ConfigError, DeliveryConfig, EnhancementConfig, HotkeyConfig,
    ProviderEndpoint, StatusConfig, TranscriptionConfig,
};
