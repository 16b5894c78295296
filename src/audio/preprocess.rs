//! Conversion of a raw capture into a provider-ready payload.
//!
//! Transcription providers expect 16 kHz mono 16-bit PCM WAV.  The native
//! capture format is whatever the device reports, so each recording goes
//! through three steps:
//!
//! 1. [`downmix_to_mono`] — average interleaved channels into one.
//! 2. [`resample`] — linear interpolation to the configured target rate.
//! 3. WAV encoding via `hound` into an in-memory buffer.
//!
//! All three are pure and deterministic.  A failure anywhere in here is
//! final for the session: the source audio cannot be re-captured, so there
//! is no retry path.

use hound::{SampleFormat, WavSpec, WavWriter};
use thiserror::Error;

use crate::audio::{AudioBlob, AudioFormat, RawRecording};
use crate::config::AudioConfig;

// ---------------------------------------------------------------------------
// PreprocessError
// ---------------------------------------------------------------------------

/// Errors from converting a raw recording.  Always fatal for the session.
#[derive(Debug, Error)]
pub enum PreprocessError {
    /// The capture reported an impossible format (zero rate or channels).
    #[error("malformed capture: {0}")]
    MalformedCapture(String),

    /// Only 16-bit PCM output is supported.
    #[error("unsupported target bit depth {0}")]
    UnsupportedBitDepth(u16),

    /// WAV encoding failed.
    #[error("WAV encoding failed: {0}")]
    Encode(String),
}

// ---------------------------------------------------------------------------
// preprocess
// ---------------------------------------------------------------------------

/// Convert a drained recording into an [`AudioBlob`] in the configured
/// upload format.
///
/// An empty recording still produces a structurally valid (header-only)
/// blob; rejecting it is the transcription gateway's job, not this stage's.
pub fn preprocess(
    recording: &RawRecording,
    config: &AudioConfig,
) -> Result<AudioBlob, PreprocessError> {
    if config.bit_depth != 16 {
        return Err(PreprocessError::UnsupportedBitDepth(config.bit_depth));
    }
    if recording.sample_rate == 0 || recording.channels == 0 {
        return Err(PreprocessError::MalformedCapture(format!(
            "{} Hz, {} channels",
            recording.sample_rate, recording.channels
        )));
    }

    let mono = downmix_to_mono(&recording.samples, recording.channels);
    let converted = resample(&mono, recording.sample_rate, config.sample_rate);
    let frames = converted.len();
    let bytes = encode_wav_16bit(&converted, config.sample_rate)?;

    Ok(AudioBlob {
        bytes,
        format: AudioFormat {
            sample_rate: config.sample_rate,
            bit_depth: 16,
            channels: 1,
        },
        frames,
    })
}

// ---------------------------------------------------------------------------
// downmix_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging each frame.
///
/// The output length is `samples.len() / channels`.  Already-mono input is
/// returned as an owned copy without averaging.
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Resample mono audio from `source_rate` to `target_rate` Hz using linear
/// interpolation.
///
/// A matching source rate (or empty input) is returned unchanged.  The
/// output length is approximately `samples.len() * target_rate /
/// source_rate`.
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate {
        return samples.to_vec();
    }
    if samples.is_empty() {
        return Vec::new();
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos as usize;
        let frac = (src_pos - idx as f64) as f32;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else if idx < samples.len() {
            samples[idx]
        } else {
            0.0
        };
        output.push(sample);
    }

    output
}

// ---------------------------------------------------------------------------
// encode_wav_16bit
// ---------------------------------------------------------------------------

/// Encode mono `f32` samples as an in-memory 16-bit PCM WAV file.
fn encode_wav_16bit(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, PreprocessError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut bytes = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut bytes);
        let mut writer =
            WavWriter::new(cursor, spec).map_err(|e| PreprocessError::Encode(e.to_string()))?;
        for &s in samples {
            let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(v)
                .map_err(|e| PreprocessError::Encode(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    }
    Ok(bytes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn default_audio_config() -> AudioConfig {
        AudioConfig {
            sample_rate: 16_000,
            bit_depth: 16,
            max_recording_secs: 300,
        }
    }

    // ---- downmix_to_mono ---------------------------------------------------

    #[test]
    fn downmix_already_mono() {
        let input = vec![0.1_f32, 0.2, 0.3];
        assert_eq!(downmix_to_mono(&input, 1), input);
    }

    #[test]
    fn downmix_stereo_averages_frames() {
        let input = vec![1.0_f32, -1.0, 0.5, 0.5];
        let out = downmix_to_mono(&input, 2);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.0).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn downmix_zero_channels_yields_empty() {
        assert!(downmix_to_mono(&[1.0_f32, 2.0], 0).is_empty());
    }

    // ---- resample ----------------------------------------------------------

    #[test]
    fn resample_same_rate_is_noop() {
        let input: Vec<f32> = (0..160).map(|i| i as f32 / 160.0).collect();
        let out = resample(&input, 16_000, 16_000);
        assert_eq!(out, input);
    }

    #[test]
    fn resample_empty_input() {
        assert!(resample(&[], 48_000, 16_000).is_empty());
    }

    #[test]
    fn resample_48k_to_16k_output_length() {
        // 480 samples @ 48 kHz = 10 ms → 160 samples @ 16 kHz
        let out = resample(&vec![0.5_f32; 480], 48_000, 16_000);
        assert_eq!(out.len(), 160);
    }

    #[test]
    fn resample_44100_to_16k_output_length() {
        let out = resample(&vec![0.0_f32; 44_100], 44_100, 16_000);
        assert!(out.len().abs_diff(16_000) <= 1, "got {}", out.len());
    }

    #[test]
    fn resample_upsamples_8k_to_16k() {
        let out = resample(&vec![0.0_f32; 80], 8_000, 16_000);
        assert_eq!(out.len(), 160);
    }

    #[test]
    fn resample_preserves_dc_amplitude() {
        let out = resample(&vec![0.5_f32; 480], 48_000, 16_000);
        for &s in &out {
            assert!((s - 0.5).abs() < 1e-5, "amplitude drift: {s}");
        }
    }

    // ---- encode_wav_16bit --------------------------------------------------

    #[test]
    fn wav_output_has_riff_header_and_sample_data() {
        let bytes = encode_wav_16bit(&[0.0_f32; 100], 16_000).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        // 44-byte canonical header + 2 bytes per 16-bit sample
        assert_eq!(bytes.len(), 44 + 100 * 2);
    }

    #[test]
    fn wav_of_empty_input_is_header_only() {
        let bytes = encode_wav_16bit(&[], 16_000).unwrap();
        assert_eq!(bytes.len(), 44);
        assert_eq!(&bytes[0..4], b"RIFF");
    }

    #[test]
    fn wav_samples_are_clamped() {
        // Out-of-range input must not wrap around when converted to i16.
        let bytes = encode_wav_16bit(&[2.0_f32, -2.0], 16_000).unwrap();
        let hi = i16::from_le_bytes([bytes[44], bytes[45]]);
        let lo = i16::from_le_bytes([bytes[46], bytes[47]]);
        assert_eq!(hi, i16::MAX);
        assert_eq!(lo, -i16::MAX);
    }

    // ---- preprocess --------------------------------------------------------

    #[test]
    fn preprocess_stereo_48k_to_mono_16k() {
        let recording = RawRecording {
            samples: vec![0.25_f32; 96_000], // 1 s of stereo @ 48 kHz
            sample_rate: 48_000,
            channels: 2,
        };
        let blob = preprocess(&recording, &default_audio_config()).unwrap();

        assert!(blob.frames.abs_diff(16_000) <= 1);
        assert_eq!(blob.format.sample_rate, 16_000);
        assert_eq!(blob.format.channels, 1);
        assert_eq!(blob.format.bit_depth, 16);
        assert!((blob.duration_secs() - 1.0).abs() < 0.01);
    }

    #[test]
    fn preprocess_empty_recording_yields_empty_blob() {
        let recording = RawRecording {
            samples: Vec::new(),
            sample_rate: 44_100,
            channels: 1,
        };
        let blob = preprocess(&recording, &default_audio_config()).unwrap();
        assert!(blob.is_empty());
        assert_eq!(blob.bytes.len(), 44);
    }

    #[test]
    fn preprocess_rejects_zero_rate_capture() {
        let recording = RawRecording {
            samples: vec![0.0; 16],
            sample_rate: 0,
            channels: 1,
        };
        let err = preprocess(&recording, &default_audio_config()).unwrap_err();
        assert!(matches!(err, PreprocessError::MalformedCapture(_)));
    }

    #[test]
    fn preprocess_rejects_unsupported_bit_depth() {
        let recording = RawRecording {
            samples: vec![0.0; 16],
            sample_rate: 16_000,
            channels: 1,
        };
        let mut cfg = default_audio_config();
        cfg.bit_depth = 24;
        let err = preprocess(&recording, &cfg).unwrap_err();
        assert!(matches!(err, PreprocessError::UnsupportedBitDepth(24)));
    }
}
