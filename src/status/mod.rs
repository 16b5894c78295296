//! Visual status indicator — a passive observer of controller state.
//!
//! The indicator has no control authority: it is told about transitions and
//! renders them, nothing flows back.  Implementations must never block or
//! fail the controller, so [`DesktopIndicator`] pushes each notification
//! onto the blocking thread pool and swallows every error at debug level.
//! When no notification surface is available the daemon simply runs without
//! visual feedback.

use crate::config::StatusConfig;

// ---------------------------------------------------------------------------
// IndicatorState
// ---------------------------------------------------------------------------

/// The controller states the indicator can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorState {
    Idle,
    Recording,
    Processing,
    Error,
}

impl IndicatorState {
    /// One-line notification text for this state.
    pub const fn summary(&self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Recording => "Recording…",
            Self::Processing => "Processing…",
            Self::Error => "Something went wrong — see the log",
        }
    }
}

// ---------------------------------------------------------------------------
// StatusIndicator
// ---------------------------------------------------------------------------

/// Observer interface for controller state transitions.
pub trait StatusIndicator: Send + Sync {
    /// Render a state transition.  Must not block.
    fn render(&self, state: IndicatorState);

    /// Transient hint that an activation was rejected because a session is
    /// already in flight.
    fn busy(&self);
}

// ---------------------------------------------------------------------------
// DesktopIndicator
// ---------------------------------------------------------------------------

/// Desktop-notification indicator backed by `notify-rust`.
pub struct DesktopIndicator {
    app_name: String,
}

impl DesktopIndicator {
    pub fn new() -> Self {
        Self {
            app_name: "VoiceFlow".to_string(),
        }
    }

    /// Fire-and-forget a notification from the blocking pool.
    ///
    /// Must be called from within a tokio runtime; the controller always is.
    fn notify(&self, body: &'static str) {
        let app_name = self.app_name.clone();
        tokio::task::spawn_blocking(move || {
            let result = notify_rust::Notification::new()
                .appname(&app_name)
                .summary(&app_name)
                .body(body)
                .show();
            if let Err(e) = result {
                // No notification surface is a supported configuration.
                log::debug!("status notification failed: {e}");
            }
        });
    }
}

impl Default for DesktopIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusIndicator for DesktopIndicator {
    fn render(&self, state: IndicatorState) {
        // Idle transitions are the steady state; only departures from it
        // are worth a popup.
        if state != IndicatorState::Idle {
            self.notify(state.summary());
        }
    }

    fn busy(&self) {
        self.notify("Already recording — activation ignored");
    }
}

// ---------------------------------------------------------------------------
// NoopIndicator
// ---------------------------------------------------------------------------

/// Indicator that renders nothing — used when notifications are disabled
/// and in headless tests.
pub struct NoopIndicator;

impl StatusIndicator for NoopIndicator {
    fn render(&self, _state: IndicatorState) {}
    fn busy(&self) {}
}

/// Pick the indicator implementation for the given configuration.
pub fn from_config(config: &StatusConfig) -> std::sync::Arc<dyn StatusIndicator> {
    if config.notifications_enabled {
        std::sync::Arc::new(DesktopIndicator::new())
    } else {
        std::sync::Arc::new(NoopIndicator)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
