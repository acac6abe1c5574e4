//! Audio helpers for voice input.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → stereo_to_mono → mono chunk (mpsc)
//!           → UtteranceDetector → AudioSamples (native rate)
//!           → resample_to_16k (inside the Whisper transcriber)
//! ```
//!
//! Capture is only compiled with the `microphone` feature; the detector and
//! the sample conversions are always available.

#[cfg(feature = "microphone")]
pub mod capture;
pub mod resample;
pub mod vad;

#[cfg(feature = "microphone")]
pub use capture::{AudioCapture, CaptureError, StreamHandle};
pub use resample::{resample_linear, resample_to_16k, rms, stereo_to_mono, WHISPER_SAMPLE_RATE};
pub use vad::UtteranceDetector;
