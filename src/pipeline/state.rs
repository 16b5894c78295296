//! Recording session entity and its status state machine.
//!
//! A [`RecordingSession`] is minted on hotkey press and destroyed when the
//! pipeline finishes, one way or the other:
//!
//! ```text
//! Idle ──arm──▶ Arming ──record──▶ Recording ──process──▶ Processing
//!                                      │                      │
//!                                      └────────fail──────────┤
//!                                                             ├─ complete ─▶ Completed
//!                                                             └─ fail ─────▶ Failed
//! ```
//!
//! The controller is the only component that owns a session or drives its
//! transitions; everything else receives payloads derived from it.  Illegal
//! transitions return [`InvalidTransition`] instead of silently corrupting
//! the lifecycle.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Opaque per-session token, minted at press-time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Lifecycle states of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Arming,
    Recording,
    Processing,
    Failed,
    Completed,
}

impl SessionStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Arming => "arming",
            Self::Recording => "recording",
            Self::Processing => "processing",
            Self::Failed => "failed",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// InvalidTransition
// ---------------------------------------------------------------------------

/// Error for an illegal lifecycle transition.
#[derive(Debug, Clone, Error)]
#[error("cannot {action} while {from}")]
pub struct InvalidTransition {
    pub from: SessionStatus,
    pub action: &'static str,
}

// ---------------------------------------------------------------------------
// RecordingSession
// ---------------------------------------------------------------------------

/// One push-to-talk session from press to terminal state.
#[derive(Debug)]
pub struct RecordingSession {
    id: SessionId,
    status: SessionStatus,
    started_at: Option<Instant>,
}

impl RecordingSession {
    /// Mint a fresh session in `Idle`.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            status: SessionStatus::Idle,
            started_at: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// `Idle → Arming`: capture is about to start.
    pub fn arm(&mut self) -> Result<(), InvalidTransition> {
        self.step(SessionStatus::Idle, SessionStatus::Arming, "arm")
    }

    /// `Arming → Recording`: capture is live; stamps the start time.
    pub fn record(&mut self, now: Instant) -> Result<(), InvalidTransition> {
        self.step(SessionStatus::Arming, SessionStatus::Recording, "record")?;
        self.started_at = Some(now);
        Ok(())
    }

    /// `Recording → Processing`: capture stopped, pipeline starting.
    pub fn process(&mut self) -> Result<(), InvalidTransition> {
        self.step(SessionStatus::Recording, SessionStatus::Processing, "process")
    }

    /// `Processing → Completed`: pipeline finished, delivery attempted.
    pub fn complete(&mut self) -> Result<(), InvalidTransition> {
        self.step(
            SessionStatus::Processing,
            SessionStatus::Completed,
            "complete",
        )
    }

    /// `Recording | Processing → Failed`: some stage reported a fatal error.
    pub fn fail(&mut self) -> Result<(), InvalidTransition> {
        match self.status {
            SessionStatus::Recording | SessionStatus::Processing => {
                self.status = SessionStatus::Failed;
                Ok(())
            }
            from => Err(InvalidTransition { from, action: "fail" }),
        }
    }

    /// When the duration cap expires for this session, if it is recording.
    pub fn deadline(&self, max_duration: Duration) -> Option<Instant> {
        if self.status != SessionStatus::Recording {
            return None;
        }
        self.started_at.map(|t| t + max_duration)
    }

    /// Time spent since recording started.
    pub fn elapsed(&self) -> Duration {
        self.started_at
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    fn step(
        &mut self,
        expect: SessionStatus,
        next: SessionStatus,
        action: &'static str,
    ) -> Result<(), InvalidTransition> {
        if self.status != expect {
            return Err(InvalidTransition {
                from: self.status,
                action,
            });
        }
        self.status = next;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> RecordingSession {
        RecordingSession::new(SessionId(1))
    }

    #[test]
    fn new_session_is_idle() {
        let s = session();
        assert_eq!(s.status(), SessionStatus::Idle);
        assert_eq!(s.elapsed(), Duration::ZERO);
    }

    #[test]
    fn full_successful_lifecycle() {
        let mut s = session();
        s.arm().unwrap();
        assert_eq!(s.status(), SessionStatus::Arming);

        s.record(Instant::now()).unwrap();
        assert_eq!(s.status(), SessionStatus::Recording);

        s.process().unwrap();
        assert_eq!(s.status(), SessionStatus::Processing);

        s.complete().unwrap();
        assert_eq!(s.status(), SessionStatus::Completed);
    }

    #[test]
    fn arm_twice_fails() {
        let mut s = session();
        s.arm().unwrap();
        let err = s.arm().unwrap_err();
        assert_eq!(err.from, SessionStatus::Arming);
        assert_eq!(err.action, "arm");
    }

    #[test]
    fn record_requires_arming() {
        let mut s = session();
        let err = s.record(Instant::now()).unwrap_err();
        assert_eq!(err.from, SessionStatus::Idle);
    }

    #[test]
    fn process_requires_recording() {
        let mut s = session();
        s.arm().unwrap();
        let err = s.process().unwrap_err();
        assert_eq!(err.from, SessionStatus::Arming);
    }

    #[test]
    fn fail_from_recording() {
        let mut s = session();
        s.arm().unwrap();
        s.record(Instant::now()).unwrap();
        s.fail().unwrap();
        assert_eq!(s.status(), SessionStatus::Failed);
    }

    #[test]
    fn fail_from_processing() {
        let mut s = session();
        s.arm().unwrap();
        s.record(Instant::now()).unwrap();
        s.process().unwrap();
        s.fail().unwrap();
        assert_eq!(s.status(), SessionStatus::Failed);
    }

    #[test]
    fn fail_from_idle_is_invalid() {
        let mut s = session();
        assert!(s.fail().is_err());
    }

    #[test]
    fn complete_requires_processing() {
        let mut s = session();
        s.arm().unwrap();
        s.record(Instant::now()).unwrap();
        let err = s.complete().unwrap_err();
        assert_eq!(err.from, SessionStatus::Recording);
    }

    #[test]
    fn deadline_only_while_recording() {
        let max = Duration::from_secs(300);
        let mut s = session();
        assert!(s.deadline(max).is_none());

        s.arm().unwrap();
        assert!(s.deadline(max).is_none());

        let start = Instant::now();
        s.record(start).unwrap();
        assert_eq!(s.deadline(max), Some(start + max));

        s.process().unwrap();
        assert!(s.deadline(max).is_none());
    }

    #[test]
    fn status_display() {
        assert_eq!(SessionStatus::Idle.to_string(), "idle");
        assert_eq!(SessionStatus::Recording.to_string(), "recording");
        assert_eq!(SessionStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn session_id_display() {
        assert_eq!(SessionId(7).to_string(), "#7");
    }

    #[test]
    fn invalid_transition_message_names_both_sides() {
        let mut s = session();
        let err = s.process().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("process"));
        assert!(msg.contains("idle"));
    }
}
