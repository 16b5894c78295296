//! Recording controller — drives the hotkey → capture → transcribe →
//! enhance → deliver loop.
//!
//! [`RecordingController`] owns the active [`RecordingSession`] and is the
//! only component that transitions it.  It consumes [`HotkeyEvent`]s from a
//! bounded `tokio::sync::mpsc` channel and races them against the
//! max-duration timer:
//!
//! ```text
//! HotkeyEvent::Pressed
//!   └─▶ mint session, arm capture                       [Recording]
//!
//! HotkeyEvent::Released  ─or─  duration cap reached
//!   └─▶ drain capture → spawn_blocking(preprocess)      [Processing]
//!         └─▶ transcription gateway (primary → fallback)
//!               └─▶ enhancement gateway (primary → fallback)
//!                     └─▶ spawn_blocking(deliver)       [Idle]
//! ```
//!
//! Processing runs inline in the event-handling turn, so no new recording
//! can be armed until the pipeline finishes.  Hotkey events that queue up
//! meanwhile are drained and rejected afterwards — rejected, not replayed,
//! because a press that happened mid-pipeline must not arm a retroactive
//! recording.  Every stage failure converges in one place, the session is
//! dropped with its buffers, and the controller is immediately usable again.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::audio::{preprocess, CaptureControl, CaptureError, PreprocessError, RawRecording};
use crate::config::AudioConfig;
use crate::deliver::{DeliveryReport, TextDelivery};
use crate::gateway::{Enhancement, GatewayError, Transcription};
use crate::hotkey::HotkeyEvent;
use crate::status::{IndicatorState, StatusIndicator};

use super::state::{RecordingSession, SessionId};

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Terminal failure of one session's pipeline run.
///
/// All stage errors funnel into this type so the controller has a single
/// failure path back to idle.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The device stream failed while the recording was live.
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),

    /// The raw capture could not be converted to the upload format.
    #[error("preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),

    /// Both transcription tiers failed, or the audio was rejected outright.
    #[error("transcription failed: {0}")]
    Transcription(GatewayError),

    /// Both enhancement tiers failed, or the transcript was rejected.
    #[error("enhancement failed: {0}")]
    Enhancement(GatewayError),

    /// Unexpected runtime failure (e.g. a blocking task panicked).
    #[error("internal error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// StopReason
// ---------------------------------------------------------------------------

/// What ended the recording phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    HotkeyReleased,
    MaxDuration,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::HotkeyReleased => "hotkey released",
            Self::MaxDuration => "max duration reached",
        })
    }
}

// ---------------------------------------------------------------------------
// RecordingController
// ---------------------------------------------------------------------------

/// Owns the recording lifecycle and serialises all sessions.
///
/// Create with [`RecordingController::new`], then call [`run`](Self::run)
/// inside a tokio task.
pub struct RecordingController {
    capture: Arc<dyn CaptureControl>,
    transcription: Arc<dyn Transcription>,
    enhancement: Arc<dyn Enhancement>,
    delivery: Arc<dyn TextDelivery>,
    indicator: Arc<dyn StatusIndicator>,
    audio_config: AudioConfig,
    /// The single in-flight session; `None` means idle.
    session: Option<RecordingSession>,
    next_session_id: u64,
}

impl RecordingController {
    pub fn new(
        capture: Arc<dyn CaptureControl>,
        transcription: Arc<dyn Transcription>,
        enhancement: Arc<dyn Enhancement>,
        delivery: Arc<dyn TextDelivery>,
        indicator: Arc<dyn StatusIndicator>,
        audio_config: AudioConfig,
    ) -> Self {
        Self {
            capture,
            transcription,
            enhancement,
            delivery,
            indicator,
            audio_config,
            session: None,
            next_session_id: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run the controller until `events` is closed.
    ///
    /// Spawn this as a tokio task from `main()`; it never returns while the
    /// channel is open.
    pub async fn run(mut self, mut events: mpsc::Receiver<HotkeyEvent>) {
        loop {
            let deadline = self
                .session
                .as_ref()
                .and_then(|s| s.deadline(self.max_duration()));

            // Pending forever unless a recording is live, so the select
            // below only races the timer while it can actually fire.
            let cap_timer = async {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            let processed = tokio::select! {
                maybe_event = events.recv() => match maybe_event {
                    Some(HotkeyEvent::Pressed) => {
                        self.on_press();
                        false
                    }
                    Some(HotkeyEvent::Released) => self.on_release().await,
                    None => break,
                },
                _ = cap_timer => self.on_cap_reached().await,
            };

            // A pipeline just ran inline; whatever queued up meanwhile must
            // be rejected, not replayed into a retroactive recording.
            if processed {
                self.reject_backlog(&mut events);
            }
        }

        log::info!("hotkey channel closed, recording controller shutting down");
    }

    fn max_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.audio_config.max_recording_secs)
    }

    fn alloc_session_id(&mut self) -> SessionId {
        self.next_session_id += 1;
        SessionId(self.next_session_id)
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    /// Hotkey press: mint and arm a session, unless one is already active.
    fn on_press(&mut self) {
        if let Some(active) = &self.session {
            log::warn!(
                "activation rejected: session {} is {}",
                active.id(),
                active.status()
            );
            self.indicator.busy();
            return;
        }

        let id = self.alloc_session_id();
        let mut session = RecordingSession::new(id);
        if let Err(e) = session.arm() {
            log::error!("session {id}: {e}");
            return;
        }

        self.capture.begin();

        if let Err(e) = session.record(Instant::now()) {
            log::error!("session {id}: {e}");
            return;
        }

        log::info!("session {id}: recording started");
        self.indicator.render(IndicatorState::Recording);
        self.session = Some(session);
    }

    /// Hotkey release: stop capture and run the pipeline.  A release with
    /// no live recording is a no-op.  Returns whether a pipeline ran.
    async fn on_release(&mut self) -> bool {
        if self.session.is_none() {
            log::debug!("hotkey release with no active recording — ignored");
            return false;
        }
        self.stop_and_process(StopReason::HotkeyReleased).await;
        true
    }

    /// Duration cap: same stop path as a release.  The user is still
    /// holding the key; their eventual release finds no session and is
    /// ignored.
    async fn on_cap_reached(&mut self) -> bool {
        log::warn!(
            "recording force-stopped at the {} s cap",
            self.audio_config.max_recording_secs
        );
        self.stop_and_process(StopReason::MaxDuration).await;
        true
    }

    // -----------------------------------------------------------------------
    // Session teardown
    // -----------------------------------------------------------------------

    /// Stop the capture and drive the pipeline to a terminal state.
    ///
    /// The session is taken out of `self` up front: whatever happens below,
    /// it is destroyed (with its buffers) when this function returns and
    /// the controller is idle again.
    async fn stop_and_process(&mut self, reason: StopReason) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        log::info!(
            "session {}: recording stopped after {:.1}s ({reason})",
            session.id(),
            session.elapsed().as_secs_f32()
        );

        let recording = match self.capture.finish() {
            Ok(recording) => recording,
            Err(e) => {
                let _ = session.fail();
                self.report_failure(session.id(), PipelineError::Capture(e));
                return;
            }
        };

        if let Err(e) = session.process() {
            log::error!("session {}: {e}", session.id());
            return;
        }
        self.indicator.render(IndicatorState::Processing);

        match self.run_pipeline(recording).await {
            Ok(report) => {
                let _ = session.complete();
                log::info!(
                    "session {}: completed (clipboard: {}, inserted: {})",
                    session.id(),
                    report.clipboard_set,
                    report.inserted
                );
                self.indicator.render(IndicatorState::Idle);
            }
            Err(e) => {
                let _ = session.fail();
                self.report_failure(session.id(), e);
            }
        }
    }

    fn report_failure(&self, id: SessionId, error: PipelineError) {
        log::error!("session {id}: {error}");
        self.indicator.render(IndicatorState::Error);
    }

    /// Drain events that queued up while the pipeline ran.  Presses are
    /// rejected with a busy signal; stale releases are discarded.
    fn reject_backlog(&self, events: &mut mpsc::Receiver<HotkeyEvent>) {
        while let Ok(event) = events.try_recv() {
            match event {
                HotkeyEvent::Pressed => {
                    log::warn!("activation rejected: arrived while a session was processing");
                    self.indicator.busy();
                }
                HotkeyEvent::Released => {
                    log::debug!("stale hotkey release discarded");
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    /// Preprocess → transcribe → enhance → deliver, strictly in order.
    ///
    /// Ownership moves forward stage to stage; nothing is retained here
    /// after the function returns.  Delivery problems are logged but do not
    /// fail the pipeline — by then the text exists and the session counts
    /// as completed.
    async fn run_pipeline(
        &self,
        recording: RawRecording,
    ) -> Result<DeliveryReport, PipelineError> {
        log::info!("captured {:.2}s of audio", recording.duration_secs());

        // CPU-bound conversion off the async runtime.
        let audio_config = self.audio_config.clone();
        let blob = tokio::task::spawn_blocking(move || preprocess(&recording, &audio_config))
            .await
            .map_err(|e| PipelineError::Internal(e.to_string()))??;

        let transcript = self
            .transcription
            .transcribe(blob)
            .await
            .map_err(PipelineError::Transcription)?;
        log::info!(
            "transcript via {} provider in {:.0?}: {:?}",
            transcript.provider,
            transcript.latency,
            transcript.text
        );

        let enhanced = self
            .enhancement
            .enhance(&transcript.text)
            .await
            .map_err(PipelineError::Enhancement)?;
        log::info!("enhanced via {} provider: {:?}", enhanced.provider, enhanced.text);

        // Clipboard and keystroke I/O can block.
        let delivery = Arc::clone(&self.delivery);
        let text = enhanced.text.clone();
        let report = tokio::task::spawn_blocking(move || delivery.deliver(&text))
            .await
            .map_err(|e| PipelineError::Internal(e.to_string()))?;

        match report {
            Ok(report) => {
                if !report.inserted {
                    log::warn!("insertion not performed; text available for manual paste");
                }
                Ok(report)
            }
            Err(e) => {
                // Non-fatal: the pipeline produced text, delivery just
                // could not place it anywhere.
                log::warn!("delivery failed: {e}");
                Ok(DeliveryReport {
                    clipboard_set: false,
                    inserted: false,
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioBlob;
    use crate::deliver::DeliveryError;
    use crate::gateway::{
        EnhancedResult, EnhancementGateway, EnhancementProvider, ProviderOutcome, ProviderTier,
        TranscriptResult, TranscriptionGateway, TranscriptionProvider,
    };
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Capture mock that hands out canned recordings.
    struct ScriptedCapture {
        begins: AtomicUsize,
        finishes: AtomicUsize,
        results: Mutex<VecDeque<Result<RawRecording, CaptureError>>>,
    }

    impl ScriptedCapture {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                begins: AtomicUsize::new(0),
                finishes: AtomicUsize::new(0),
                results: Mutex::new(VecDeque::new()),
            })
        }

        fn push(&self, result: Result<RawRecording, CaptureError>) {
            self.results.lock().unwrap().push_back(result);
        }

        fn two_seconds() -> RawRecording {
            RawRecording {
                samples: vec![0.1_f32; 32_000],
                sample_rate: 16_000,
                channels: 1,
            }
        }
    }

    impl CaptureControl for ScriptedCapture {
        fn begin(&self) {
            self.begins.fetch_add(1, Ordering::SeqCst);
        }

        fn finish(&self) -> Result<RawRecording, CaptureError> {
            self.finishes.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Self::two_seconds()))
        }
    }

    /// Transcription mock with scripted per-call results.
    struct ScriptedTranscription {
        calls: AtomicUsize,
        results: Mutex<VecDeque<Result<String, GatewayError>>>,
    }

    impl ScriptedTranscription {
        fn always(text: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                results: Mutex::new(VecDeque::from([Ok(text.to_string())])),
            })
        }

        fn scripted(results: Vec<Result<String, GatewayError>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                results: Mutex::new(results.into()),
            })
        }
    }

    #[async_trait]
    impl Transcription for ScriptedTranscription {
        async fn transcribe(&self, _audio: AudioBlob) -> Result<TranscriptResult, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut results = self.results.lock().unwrap();
            let next = results
                .pop_front()
                .unwrap_or_else(|| Ok("default transcript".into()));
            if results.is_empty() {
                if let Ok(text) = &next {
                    results.push_back(Ok(text.clone()));
                }
            }
            next.map(|text| TranscriptResult {
                text,
                provider: ProviderTier::Primary,
                latency: std::time::Duration::from_millis(5),
            })
        }
    }

    /// Enhancement mock that upper-cases the transcript.
    struct EchoEnhancement {
        calls: AtomicUsize,
        fail_first: Mutex<Option<GatewayError>>,
    }

    impl EchoEnhancement {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_first: Mutex::new(None),
            })
        }

        fn failing_once(error: GatewayError) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_first: Mutex::new(Some(error)),
            })
        }
    }

    #[async_trait]
    impl Enhancement for EchoEnhancement {
        async fn enhance(&self, transcript: &str) -> Result<EnhancedResult, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.fail_first.lock().unwrap().take() {
                return Err(err);
            }
            Ok(EnhancedResult {
                text: transcript.to_uppercase(),
                provider: ProviderTier::Primary,
            })
        }
    }

    /// Delivery mock capturing everything delivered.
    struct RecordingDelivery {
        delivered: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingDelivery {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                delivered: Mutex::new(Vec::new()),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                delivered: Mutex::new(Vec::new()),
                fail: true,
            })
        }

        fn texts(&self) -> Vec<String> {
            self.delivered.lock().unwrap().clone()
        }
    }

    impl TextDelivery for RecordingDelivery {
        fn deliver(&self, text: &str) -> Result<DeliveryReport, DeliveryError> {
            if self.fail {
                return Err(DeliveryError::ClipboardAccess("no display".into()));
            }
            self.delivered.lock().unwrap().push(text.to_string());
            Ok(DeliveryReport {
                clipboard_set: true,
                inserted: true,
            })
        }
    }

    /// Indicator mock recording the rendered state sequence.
    struct TraceIndicator {
        states: Mutex<Vec<IndicatorState>>,
        busy: AtomicUsize,
    }

    impl TraceIndicator {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                states: Mutex::new(Vec::new()),
                busy: AtomicUsize::new(0),
            })
        }

        fn states(&self) -> Vec<IndicatorState> {
            self.states.lock().unwrap().clone()
        }

        fn busy_count(&self) -> usize {
            self.busy.load(Ordering::SeqCst)
        }
    }

    impl StatusIndicator for TraceIndicator {
        fn render(&self, state: IndicatorState) {
            self.states.lock().unwrap().push(state);
        }

        fn busy(&self) {
            self.busy.fetch_add(1, Ordering::SeqCst);
        }
    }

    // -----------------------------------------------------------------------
    // Harness
    // -----------------------------------------------------------------------

    struct Harness {
        capture: Arc<ScriptedCapture>,
        transcription: Arc<ScriptedTranscription>,
        enhancement: Arc<EchoEnhancement>,
        delivery: Arc<RecordingDelivery>,
        indicator: Arc<TraceIndicator>,
    }

    impl Harness {
        fn controller(&self, max_recording_secs: u64) -> RecordingController {
            RecordingController::new(
                self.capture.clone(),
                self.transcription.clone(),
                self.enhancement.clone(),
                self.delivery.clone(),
                self.indicator.clone(),
                AudioConfig {
                    sample_rate: 16_000,
                    bit_depth: 16,
                    max_recording_secs,
                },
            )
        }
    }

    fn harness() -> Harness {
        Harness {
            capture: ScriptedCapture::new(),
            transcription: ScriptedTranscription::always("hello world"),
            enhancement: EchoEnhancement::new(),
            delivery: RecordingDelivery::new(),
            indicator: TraceIndicator::new(),
        }
    }

    async fn drive(controller: RecordingController, events: Vec<HotkeyEvent>) {
        let (tx, rx) = mpsc::channel(16);
        for event in events {
            tx.send(event).await.unwrap();
        }
        drop(tx); // close the channel so run() returns
        controller.run(rx).await;
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    /// Press → speak → release delivers the enhanced transcript and leaves
    /// the controller idle.
    #[tokio::test]
    async fn press_release_delivers_enhanced_text() {
        let h = harness();
        drive(
            h.controller(300),
            vec![HotkeyEvent::Pressed, HotkeyEvent::Released],
        )
        .await;

        assert_eq!(h.delivery.texts(), vec!["HELLO WORLD"]);
        assert_eq!(h.capture.begins.load(Ordering::SeqCst), 1);
        assert_eq!(h.capture.finishes.load(Ordering::SeqCst), 1);
        assert_eq!(
            h.indicator.states(),
            vec![
                IndicatorState::Recording,
                IndicatorState::Processing,
                IndicatorState::Idle,
            ]
        );
    }

    /// A release with no active recording must be a no-op.
    #[tokio::test]
    async fn release_without_press_is_ignored() {
        let h = harness();
        drive(h.controller(300), vec![HotkeyEvent::Released]).await;

        assert!(h.delivery.texts().is_empty());
        assert_eq!(h.capture.finishes.load(Ordering::SeqCst), 0);
        assert!(h.indicator.states().is_empty());
    }

    /// A second press while recording is rejected with a busy signal and
    /// leaves the original session untouched.
    #[tokio::test]
    async fn second_press_while_recording_is_rejected() {
        let h = harness();
        drive(
            h.controller(300),
            vec![
                HotkeyEvent::Pressed,
                HotkeyEvent::Pressed,
                HotkeyEvent::Released,
            ],
        )
        .await;

        assert_eq!(h.delivery.texts().len(), 1);
        assert_eq!(h.capture.begins.load(Ordering::SeqCst), 1);
        assert_eq!(h.indicator.busy_count(), 1);
    }

    /// A press that queues up while the pipeline runs is rejected
    /// afterwards, not replayed into a new recording.
    #[tokio::test]
    async fn press_during_processing_is_rejected_not_queued() {
        let h = harness();
        drive(
            h.controller(300),
            vec![
                HotkeyEvent::Pressed,
                HotkeyEvent::Released,
                // Already queued when the pipeline starts running.
                HotkeyEvent::Pressed,
                HotkeyEvent::Released,
            ],
        )
        .await;

        assert_eq!(h.delivery.texts().len(), 1);
        assert_eq!(h.capture.begins.load(Ordering::SeqCst), 1);
        assert_eq!(h.indicator.busy_count(), 1);
    }

    /// An empty (near-zero) recording still enters the pipeline; rejecting
    /// it is the transcription stage's call.
    #[tokio::test]
    async fn short_recording_still_reaches_transcription() {
        let h = harness();
        h.capture.push(Ok(RawRecording {
            samples: Vec::new(),
            sample_rate: 16_000,
            channels: 1,
        }));

        drive(
            h.controller(300),
            vec![HotkeyEvent::Pressed, HotkeyEvent::Released],
        )
        .await;

        assert_eq!(h.transcription.calls.load(Ordering::SeqCst), 1);
    }

    /// A capture fault aborts the session, and the next cycle works — one
    /// failure never locks the controller out.
    #[tokio::test]
    async fn capture_fault_aborts_session_without_lockout() {
        let h = harness();
        h.capture
            .push(Err(CaptureError::Stream("device unplugged".into())));

        drive(
            h.controller(300),
            vec![
                HotkeyEvent::Pressed,
                HotkeyEvent::Released,
                HotkeyEvent::Pressed,
                HotkeyEvent::Released,
            ],
        )
        .await;

        // First cycle failed before transcription, second succeeded.
        assert_eq!(h.transcription.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.delivery.texts().len(), 1);
        assert!(h.indicator.states().contains(&IndicatorState::Error));
    }

    /// Transcription failure surfaces as a failed session; the following
    /// cycle succeeds.
    #[tokio::test]
    async fn transcription_failure_returns_to_idle() {
        let h = Harness {
            transcription: ScriptedTranscription::scripted(vec![
                Err(GatewayError::BothFailed {
                    primary: "timeout".into(),
                    fallback: "503".into(),
                }),
                Ok("take two".into()),
            ]),
            ..harness()
        };

        drive(
            h.controller(300),
            vec![
                HotkeyEvent::Pressed,
                HotkeyEvent::Released,
                HotkeyEvent::Pressed,
                HotkeyEvent::Released,
            ],
        )
        .await;

        assert_eq!(h.delivery.texts(), vec!["TAKE TWO"]);
        assert!(h.indicator.states().contains(&IndicatorState::Error));
        // The failed cycle never reached enhancement.
        assert_eq!(h.enhancement.calls.load(Ordering::SeqCst), 1);
    }

    /// Enhancement failure after a successful transcription delivers
    /// nothing and returns to idle.
    #[tokio::test]
    async fn enhancement_failure_delivers_nothing() {
        let h = Harness {
            enhancement: EchoEnhancement::failing_once(GatewayError::Fatal(
                "payload rejected".into(),
            )),
            ..harness()
        };

        drive(
            h.controller(300),
            vec![HotkeyEvent::Pressed, HotkeyEvent::Released],
        )
        .await;

        assert!(h.delivery.texts().is_empty());
        assert_eq!(
            h.indicator.states(),
            vec![
                IndicatorState::Recording,
                IndicatorState::Processing,
                IndicatorState::Error,
            ]
        );
    }

    /// Delivery failure is non-fatal: the session still completes.
    #[tokio::test]
    async fn delivery_failure_still_completes_session() {
        let h = Harness {
            delivery: RecordingDelivery::failing(),
            ..harness()
        };

        drive(
            h.controller(300),
            vec![HotkeyEvent::Pressed, HotkeyEvent::Released],
        )
        .await;

        assert_eq!(
            h.indicator.states(),
            vec![
                IndicatorState::Recording,
                IndicatorState::Processing,
                IndicatorState::Idle,
            ]
        );
    }

    /// Holding the key past the cap force-stops the recording at the bound
    /// without a release event.
    #[tokio::test(start_paused = true)]
    async fn cap_force_stops_recording() {
        let h = harness();
        let controller = h.controller(1);

        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(controller.run(rx));

        tx.send(HotkeyEvent::Pressed).await.unwrap();
        // The paused clock auto-advances to the 1 s cap while the key is
        // still "held" (no release is ever sent).
        tokio::time::sleep(std::time::Duration::from_secs(3)).await;

        drop(tx);
        task.await.unwrap();

        assert_eq!(h.capture.finishes.load(Ordering::SeqCst), 1);
        assert_eq!(h.delivery.texts(), vec!["HELLO WORLD"]);
    }

    /// A late release after the cap already stopped the session does not
    /// start anything, stop anything, or deliver twice.
    #[tokio::test(start_paused = true)]
    async fn release_after_cap_is_a_noop() {
        let h = harness();
        let controller = h.controller(1);

        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(controller.run(rx));

        tx.send(HotkeyEvent::Pressed).await.unwrap();
        // Wait for the cap to fire and the pipeline to deliver.
        while h.delivery.texts().is_empty() {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }

        // The user finally lets go.
        tx.send(HotkeyEvent::Released).await.unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(h.delivery.texts().len(), 1);
        assert_eq!(h.capture.begins.load(Ordering::SeqCst), 1);
        assert_eq!(h.capture.finishes.load(Ordering::SeqCst), 1);
    }

    /// End-to-end through the real gateways: transcription primary times
    /// out and the fallback answers; enhancement primary fails fatally, so
    /// nothing is delivered and the controller returns to idle.
    #[tokio::test]
    async fn fallback_transcript_then_fatal_enhancement() {
        struct FixedTranscriber(ProviderOutcome<String>);

        #[async_trait]
        impl TranscriptionProvider for FixedTranscriber {
            fn name(&self) -> &str {
                "stub"
            }
            async fn transcribe(&self, _audio: &AudioBlob) -> ProviderOutcome<String> {
                self.0.clone()
            }
        }

        struct FixedEnhancer(ProviderOutcome<String>);

        #[async_trait]
        impl EnhancementProvider for FixedEnhancer {
            fn name(&self) -> &str {
                "stub"
            }
            async fn enhance(&self, _transcript: &str) -> ProviderOutcome<String> {
                self.0.clone()
            }
        }

        let transcription = Arc::new(TranscriptionGateway::new(
            Arc::new(FixedTranscriber(ProviderOutcome::Retryable("timeout".into()))),
            Arc::new(FixedTranscriber(ProviderOutcome::Success(
                "fallback transcript".into(),
            ))),
        ));
        let enhancement = Arc::new(EnhancementGateway::new(
            Arc::new(FixedEnhancer(ProviderOutcome::Fatal("rejected".into()))),
            Arc::new(FixedEnhancer(ProviderOutcome::Success("unused".into()))),
        ));

        let capture = ScriptedCapture::new();
        let delivery = RecordingDelivery::new();
        let indicator = TraceIndicator::new();

        let controller = RecordingController::new(
            capture.clone(),
            transcription,
            enhancement,
            delivery.clone(),
            indicator.clone(),
            AudioConfig {
                sample_rate: 16_000,
                bit_depth: 16,
                max_recording_secs: 300,
            },
        );

        drive(controller, vec![HotkeyEvent::Pressed, HotkeyEvent::Released]).await;

        assert!(delivery.texts().is_empty());
        assert!(indicator.states().contains(&IndicatorState::Error));
    }
}
