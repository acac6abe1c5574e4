//! Energy-based utterance detection.
//!
//! [`UtteranceDetector`] turns a continuous stream of mono chunks into
//! discrete utterances for the voice input source.
//!
//! ## Algorithm
//!
//! Each incoming chunk is classified as *speech* when its RMS amplitude
//! exceeds the threshold.
//!
//! ```text
//!   silence ... silence │ speech speech silence speech silence silence silence
//!   (dropped)           │ ◄──────────────── recorded ──────────────────────►
//!                       │                             └─ silence_duration ─┘
//! ```
//!
//! Recording starts at the first speech chunk and keeps every chunk after it.
//! Once the trailing silence exceeds `silence_duration` the recording is
//! emitted, unless it is shorter than `min_speech` in total, in which case it
//! is discarded and the detector goes back to listening.

use crate::audio::resample::rms;
use crate::config::AudioConfig;

/// Stateful speech/silence segmenter.
///
/// # Example
///
/// ```rust
/// use voice_chat::audio::UtteranceDetector;
///
/// // 100 Hz "sample rate" keeps the numbers small: 10 samples = 0.1 s.
/// let mut det = UtteranceDetector::new(100, 0.1, 0.2, 0.3);
/// assert!(det.push(&[0.0; 10]).is_none()); // silence before speech
/// assert!(det.push(&[0.5; 10]).is_none()); // speech
/// assert!(det.push(&[0.5; 10]).is_none());
/// assert!(det.push(&[0.0; 10]).is_none()); // 0.1 s of silence
/// assert!(det.push(&[0.0; 10]).is_none()); // 0.2 s, not yet over
/// let utterance = det.push(&[0.0; 10]).unwrap();
/// assert_eq!(utterance.len(), 50);
/// ```
#[derive(Debug, Clone)]
pub struct UtteranceDetector {
    threshold: f32,
    silence_samples: usize,
    min_speech_samples: usize,
    recorded: Vec<f32>,
    speaking: bool,
    silent_run: usize,
}

impl UtteranceDetector {
    pub fn new(
        sample_rate: u32,
        threshold: f32,
        silence_duration_secs: f32,
        min_speech_secs: f32,
    ) -> Self {
        let to_samples = |secs: f32| (secs.max(0.0) * sample_rate as f32).round() as usize;
        Self {
            threshold,
            silence_samples: to_samples(silence_duration_secs),
            min_speech_samples: to_samples(min_speech_secs),
            recorded: Vec::new(),
            speaking: false,
            silent_run: 0,
        }
    }

    pub fn from_config(sample_rate: u32, config: &AudioConfig) -> Self {
        Self::new(
            sample_rate,
            config.silence_threshold,
            config.silence_duration_secs,
            config.min_speech_secs,
        )
    }

    /// `true` when `chunk` is loud enough to count as speech.
    pub fn is_speech(&self, chunk: &[f32]) -> bool {
        rms(chunk) > self.threshold
    }

    /// `true` once speech has been heard and recording is in progress.
    pub fn is_recording(&self) -> bool {
        self.speaking
    }

    /// Feed one mono chunk; returns a complete utterance when one ends.
    pub fn push(&mut self, chunk: &[f32]) -> Option<Vec<f32>> {
        if self.is_speech(chunk) {
            self.speaking = true;
            self.silent_run = 0;
            self.recorded.extend_from_slice(chunk);
            return None;
        }

        if !self.speaking {
            return None;
        }

        self.recorded.extend_from_slice(chunk);
        self.silent_run += chunk.len();
        if self.silent_run <= self.silence_samples {
            return None;
        }

        if self.recorded.len() < self.min_speech_samples {
            log::debug!(
                "audio: discarding {} samples shorter than minimum speech length",
                self.recorded.len()
            );
            self.reset();
            return None;
        }

        let utterance = std::mem::take(&mut self.recorded);
        self.reset();
        Some(utterance)
    }

    /// Drop any partial recording and go back to listening.
    pub fn reset(&mut self) {
        self.recorded.clear();
        self.speaking = false;
        self.silent_run = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
