//! Core transcriber trait and test double.
//!
//! # Overview
//!
//! [`Transcriber`] is the interface the transcribe worker calls.  It is
//! object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn Transcriber>` and moved onto the blocking thread pool.
//!
//! [`MockTranscriber`] (available under `#[cfg(test)]`) returns a
//! pre-configured response without loading any model file.

use thiserror::Error;

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// All errors that can arise from the STT subsystem.
#[derive(Debug, Clone, Error)]
pub enum SttError {
    /// The GGML model file was not found at the given path.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// The backend failed to initialise its context or per-call state.
    #[error("Whisper context initialisation failed: {0}")]
    ContextInit(String),

    /// An error occurred during the inference pass.
    #[error("Transcription error: {0}")]
    Transcription(String),

    /// No transcription backend is available in this build.
    #[error("Transcriber unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Transcriber trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for speech-to-text backends.
///
/// # Contract
///
/// - `samples` are mono f32 PCM at `sample_rate` Hz.  Backends resample
///   internally if they need a fixed rate.
/// - `Ok(None)` (or an empty string) means "no confident transcript".
/// - The call may block for seconds; callers run it on
///   `tokio::task::spawn_blocking`.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<Option<String>, SttError>;
}

// Compile-time assertion: Box<dyn Transcriber> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Transcriber>) {}
};

/// `true` when `text` contains at least one alphanumeric character.
///
/// Whisper emits things like `"..."`, `" "` or `"[BLANK_AUDIO]"` brackets
/// for noise; punctuation-only output is treated as no speech.
///
/// ```
/// use voice_chat::stt::has_usable_speech;
///
/// assert!(has_usable_speech("hello"));
/// assert!(has_usable_speech(" 42 "));
/// assert!(!has_usable_speech(" ... "));
/// assert!(!has_usable_speech(""));
/// ```
pub fn has_usable_speech(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}

// ---------------------------------------------------------------------------
// MockTranscriber  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a pre-configured response and counts calls.
#[cfg(test)]
pub struct MockTranscriber {
    response: Result<Option<String>, SttError>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockTranscriber {
    /// Always returns `Ok(Some(text))`.
    pub fn ok(text: impl Into<String>) -> Self {
        Self::with(Ok(Some(text.into())))
    }

    /// Always returns `Ok(None)`.
    pub fn silent() -> Self {
        Self::with(Ok(None))
    }

    /// Always returns `Err(error)`.
    pub fn err(error: SttError) -> Self {
        Self::with(Err(error))
    }

    fn with(response: Result<Option<String>, SttError>) -> Self {
        Self {
            response,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl Transcriber for MockTranscriber {
    fn transcribe(&self, _samples: &[f32], _sample_rate: u32) -> Result<Option<String>, SttError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // --- MockTranscriber ---

    #[test]
    fn mock_ok_returns_configured_text() {
        let t = MockTranscriber::ok("hello there");
        assert_eq!(
            t.transcribe(&[0.0; 160], 16_000).unwrap(),
            Some("hello there".into())
        );
        assert_eq!(t.calls(), 1);
    }

    #[test]
    fn mock_err_returns_configured_error() {
        let t = MockTranscriber::err(SttError::Transcription("boom".into()));
        let err = t.transcribe(&[], 16_000).unwrap_err();
        assert!(matches!(err, SttError::Transcription(_)));
    }

    #[test]
    fn box_dyn_transcriber_compiles() {
        let t: Box<dyn Transcriber> = Box::new(MockTranscriber::silent());
        assert_eq!(t.transcribe(&[], 44_100).unwrap(), None);
    }

    // --- has_usable_speech ---

    #[test]
    fn usable_speech_needs_alphanumeric() {
        assert!(has_usable_speech("Hi."));
        assert!(has_usable_speech("สวัสดี"));
        assert!(!has_usable_speech("?!"));
        assert!(!has_usable_speech("   \n"));
    }

    // --- SttError display ---

    #[test]
    fn stt_error_display_model_not_found() {
        let e = SttError::ModelNotFound("/some/path.bin".into());
        assert!(e.to_string().contains("/some/path.bin"));
    }
}
