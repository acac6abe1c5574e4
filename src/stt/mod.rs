//! Speech-to-text.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 Transcriber (trait)                  │
//! │                                                      │
//! │   AudioSamples ──▶ transcribe(samples, rate)         │
//! │                        │                             │
//! │                        ▼                             │
//! │              Option<String> ──▶ has_usable_speech    │
//! │                                                      │
//! │   WhisperTranscriber  (feature "whisper")            │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! The transcribe worker calls the trait on `spawn_blocking`; anything that
//! fails [`has_usable_speech`] ends the turn silently.

pub mod engine;
#[cfg(feature = "whisper")]
pub mod whisper;

pub use engine::{has_usable_speech, SttError, Transcriber};
#[cfg(feature = "whisper")]
pub use whisper::WhisperTranscriber;

#[cfg(test)]
pub use engine::MockTranscriber;
