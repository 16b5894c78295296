//! Recording lifecycle orchestration.
//!
//! This module wires the hotkey → capture → transcribe → enhance → deliver
//! pipeline around a single owned [`RecordingSession`].
//!
//! # Architecture
//!
//! ```text
//! HotkeyEvent (mpsc)          max-duration timer
//!        │                           │
//!        └──────────┬────────────────┘
//!                   ▼
//! RecordingController::run()  ← async tokio task
//!        │
//!        ├─ Pressed   → mint session, arm capture        [Recording]
//!        │
//!        └─ Released / cap reached
//!              │
//!              ├─ drain capture sink
//!              ├─ spawn_blocking(preprocess)              [Processing]
//!              ├─ TranscriptionGateway (primary→fallback)
//!              ├─ EnhancementGateway   (primary→fallback)
//!              └─ spawn_blocking(deliver)                 [Idle]
//!
//! StatusIndicator ←── passive observer of every transition
//! ```
//!
//! Exactly one session exists in a non-idle state at any time; the
//! controller rejects overlapping activations instead of queueing them.

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{PipelineError, RecordingController};
pub use state::{InvalidTransition, RecordingSession, SessionId, SessionStatus};
