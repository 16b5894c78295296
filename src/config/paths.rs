//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\voiceflow\
//!   macOS:   ~/Library/Application Support/voiceflow/
//!   Linux:   ~/.config/voiceflow/
//!
//! Lock file (single-instance guard):
//!   Linux:   $XDG_RUNTIME_DIR/voiceflow.lock
//!   elsewhere (or when no runtime dir exists): <tmp>/voiceflow.lock

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Full path to the single-instance lock file.
    pub lock_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "voiceflow";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory / system temp dir when the
    /// platform cannot provide a standard path (should be extremely rare in
    /// practice).
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");

        let lock_file = dirs::runtime_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(format!("{}.lock", Self::APP_NAME));

        Self {
            config_dir,
            settings_file,
            lock_file,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
