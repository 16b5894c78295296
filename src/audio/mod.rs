//! Audio pipeline — microphone capture → recording sink → preprocessing.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → RecordingSink (armed while the hotkey is held)
//!           → RawRecording → downmix → resample → WAV encode → AudioBlob
//! ```
//!
//! The cpal stream runs for the daemon's whole lifetime; the sink only keeps
//! samples while it is armed.  Preprocessing happens once per recording, off
//! the audio thread, and produces the immutable [`AudioBlob`] handed to the
//! transcription stage.

pub mod capture;
pub mod preprocess;

pub use capture::{
    AudioCapture, CaptureControl, CaptureError, RawRecording, RecordingSink, StreamHandle,
};
pub use preprocess::{preprocess, PreprocessError};

// ---------------------------------------------------------------------------
// AudioFormat / AudioBlob
// ---------------------------------------------------------------------------

/// Format descriptor for an encoded audio payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bits per sample of the PCM data.
    pub bit_depth: u16,
    /// Number of channels (the preprocessor always emits mono).
    pub channels: u16,
}

/// Immutable, provider-ready audio payload.
///
/// Produced by [`preprocess`]; consumed by the transcription gateway.  The
/// byte payload is a complete WAV file held in memory — it is moved forward
/// through the pipeline and dropped with the session, so no staging files
/// are left behind on any exit path.
#[derive(Debug, Clone)]
pub struct AudioBlob {
    /// Complete WAV file contents.
    pub bytes: Vec<u8>,
    /// Format the payload was encoded with.
    pub format: AudioFormat,
    /// Number of PCM frames in the payload (0 for an empty recording).
    pub frames: usize,
}

impl AudioBlob {
    /// Duration of the encoded audio in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.format.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f32 / self.format.sample_rate as f32
    }

    /// Returns `true` when the payload contains no audio frames.
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_duration_from_frames() {
        let blob = AudioBlob {
            bytes: vec![0; 44],
            format: AudioFormat {
                sample_rate: 16_000,
                bit_depth: 16,
                channels: 1,
            },
            frames: 8_000,
        };
        assert!((blob.duration_secs() - 0.5).abs() < 1e-6);
        assert!(!blob.is_empty());
    }

    #[test]
    fn empty_blob_reports_empty() {
        let blob = AudioBlob {
            bytes: vec![0; 44],
            format: AudioFormat {
                sample_rate: 16_000,
                bit_depth: 16,
                channels: 1,
            },
            frames: 0,
        };
        assert!(blob.is_empty());
        assert_eq!(blob.duration_secs(), 0.0);
    }
}
