//! Microphone capture via `cpal`.
//!
//! [`AudioCapture`] wraps the cpal host/device/stream lifecycle.  The stream
//! is started once at daemon startup and feeds a [`RecordingSink`]; the sink
//! only retains samples while it is armed, so "start recording" and "stop
//! recording" are sink operations and never touch the device.
//!
//! Arming, appending and draining all happen under the same lock.  That is
//! what guarantees the drain-before-close contract: every sample the device
//! delivered before the stop request is part of the drained recording, and
//! nothing delivered afterwards leaks into the next one.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors from setting up or running the audio capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    /// The stream reported an error mid-recording; the affected recording is
    /// discarded.
    #[error("audio stream failed while recording: {0}")]
    Stream(String),
}

// ---------------------------------------------------------------------------
// RawRecording
// ---------------------------------------------------------------------------

/// One drained recording, still in the device's native format.
///
/// Samples are interleaved `f32` in `[-1.0, 1.0]`.  Ownership moves into the
/// preprocessing stage, which replaces it with an [`crate::audio::AudioBlob`].
#[derive(Debug, Clone)]
pub struct RawRecording {
    /// Interleaved PCM samples.
    pub samples: Vec<f32>,
    /// Native sample rate in Hz (commonly 44 100 or 48 000).
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

impl RawRecording {
    /// Duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / (self.sample_rate as f32 * self.channels as f32)
    }
}

// ---------------------------------------------------------------------------
// CaptureControl
// ---------------------------------------------------------------------------

/// The capture operations the recording controller drives.
///
/// [`RecordingSink`] is the production implementation; tests substitute a
/// mock that returns canned recordings.
pub trait CaptureControl: Send + Sync {
    /// Discard any leftover samples and start retaining new ones.
    fn begin(&self);

    /// Stop retaining samples and hand over everything captured since
    /// [`begin`](Self::begin).
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Stream`] when the device stream failed during
    /// the recording; the partial capture is discarded in that case.
    fn finish(&self) -> Result<RawRecording, CaptureError>;
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

struct SinkState {
    samples: Vec<f32>,
    armed: bool,
    fault: Option<String>,
    overflowed: bool,
}

/// Shared buffer between the cpal callback and the recording controller.
///
/// Cheap to clone (`Arc` clone).  The callback appends only while the sink
/// is armed; the controller arms it on hotkey press and drains it on stop.
/// Capacity is bounded a little above the configured maximum recording
/// length as a backstop — the duration cap itself is enforced by the
/// controller's timer.
#[derive(Clone)]
pub struct RecordingSink {
    state: Arc<Mutex<SinkState>>,
    sample_rate: u32,
    channels: u16,
    max_samples: usize,
}

impl RecordingSink {
    /// Create a sink for a stream with the given native format, able to hold
    /// up to `max_secs` (plus a small margin) of audio.
    pub fn new(sample_rate: u32, channels: u16, max_secs: u64) -> Self {
        let frames = sample_rate as u64 * (max_secs + 2);
        Self {
            state: Arc::new(Mutex::new(SinkState {
                samples: Vec::new(),
                armed: false,
                fault: None,
                overflowed: false,
            })),
            sample_rate,
            channels,
            max_samples: (frames * channels as u64) as usize,
        }
    }

    /// Append samples from the audio callback.  A no-op while disarmed.
    pub fn push(&self, data: &[f32]) {
        let mut state = self.state.lock().unwrap();
        if !state.armed || state.fault.is_some() {
            return;
        }
        let room = self.max_samples.saturating_sub(state.samples.len());
        if room < data.len() && !state.overflowed {
            state.overflowed = true;
            log::warn!("recording sink full; discarding further samples");
        }
        let take = room.min(data.len());
        state.samples.extend_from_slice(&data[..take]);
    }

    /// Record a stream failure.  The next [`finish`](CaptureControl::finish)
    /// returns an error and the partial capture is dropped.
    pub fn fault(&self, reason: String) {
        let mut state = self.state.lock().unwrap();
        if state.fault.is_none() {
            state.fault = Some(reason);
        }
    }

    /// Number of samples currently buffered.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().samples.len()
    }

    /// Returns `true` when no samples are buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CaptureControl for RecordingSink {
    fn begin(&self) {
        let mut state = self.state.lock().unwrap();
        state.samples.clear();
        state.armed = true;
        state.fault = None;
        state.overflowed = false;
    }

    fn finish(&self) -> Result<RawRecording, CaptureError> {
        let mut state = self.state.lock().unwrap();
        state.armed = false;
        let samples = std::mem::take(&mut state.samples);
        if let Some(reason) = state.fault.take() {
            return Err(CaptureError::Stream(reason));
        }
        Ok(RawRecording {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
        })
    }
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard that keeps the cpal stream alive.
///
/// Dropping this value stops the underlying hardware stream.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Microphone wrapper built on top of `cpal`.
///
/// # Example
///
/// ```rust,no_run
/// use voiceflow::audio::{AudioCapture, CaptureControl};
///
/// let capture = AudioCapture::open().unwrap();
/// let sink = capture.sink(300);
/// let _handle = capture.start(sink.clone()).unwrap();
///
/// sink.begin();
/// // ... hotkey held ...
/// let recording = sink.finish().unwrap();
/// ```
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    /// Native sample rate reported by the device (Hz).
    sample_rate: u32,
    /// Number of interleaved channels reported by the device.
    channels: u16,
}

impl AudioCapture {
    /// Bind the system default input device.
    ///
    /// Queries the device's preferred stream configuration so no manual
    /// configuration is required.  Failure here means the microphone is
    /// unavailable or access is denied — a startup-fatal condition.
    pub fn open() -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        let supported = device.default_input_config()?;
        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;
        let config: cpal::StreamConfig = supported.into();

        Ok(Self {
            device,
            config,
            sample_rate,
            channels,
        })
    }

    /// Build a [`RecordingSink`] matching this device's native format.
    pub fn sink(&self, max_secs: u64) -> RecordingSink {
        RecordingSink::new(self.sample_rate, self.channels, max_secs)
    }

    /// Start the capture stream feeding `sink`.
    ///
    /// The cpal callback runs on a dedicated audio thread.  Stream errors do
    /// not panic the audio thread — they poison the sink so the controller
    /// aborts the affected session.
    pub fn start(&self, sink: RecordingSink) -> Result<StreamHandle, CaptureError> {
        let error_sink = sink.clone();

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                sink.push(data);
            },
            move |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
                error_sink.fault(err.to_string());
            },
            None, // no timeout
        )?;

        stream.play()?;
        Ok(StreamHandle { _stream: stream })
    }

    /// Native sample rate of the capture stream in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels delivered by the device.
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
