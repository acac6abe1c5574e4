//! Local Whisper transcription via `whisper-rs`.
//!
//! A new `WhisperState` is created for every call so one loaded model can be
//! shared across threads without locking.

use std::path::Path;

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::{resample_to_16k, WHISPER_SAMPLE_RATE};
use crate::stt::engine::{SttError, Transcriber};

/// Clips shorter than this (0.5 s at 16 kHz) are not worth a Whisper pass.
const MIN_AUDIO_SAMPLES: usize = 8_000;

/// Threads handed to Whisper, capped at 8.
fn inference_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

pub struct WhisperTranscriber {
    ctx: WhisperContext,
    /// ISO-639-1 code, or `None` for auto-detection.
    language: Option<String>,
    n_threads: i32,
}

impl std::fmt::Debug for WhisperTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperTranscriber")
            .field("language", &self.language)
            .field("n_threads", &self.n_threads)
            .finish_non_exhaustive()
    }
}

impl WhisperTranscriber {
    /// Load a GGML model.  `language == "auto"` enables detection.
    pub fn load(model_path: impl AsRef<Path>, language: &str, use_gpu: bool) -> Result<Self, SttError> {
        let path = model_path.as_ref();
        if !path.exists() {
            return Err(SttError::ModelNotFound(path.display().to_string()));
        }
        let path_str = path.to_str().ok_or_else(|| {
            SttError::ModelNotFound(format!("non-UTF-8 model path: {}", path.display()))
        })?;

        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu = use_gpu;
        let ctx = WhisperContext::new_with_params(path_str, ctx_params)
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        log::info!("stt: loaded Whisper model {}", path.display());

        Ok(Self {
            ctx,
            language: (language != "auto").then(|| language.to_string()),
            n_threads: inference_threads(),
        })
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<Option<String>, SttError> {
        let audio = if sample_rate == WHISPER_SAMPLE_RATE {
            samples.to_vec()
        } else {
            resample_to_16k(samples, sample_rate)
        };
        if audio.len() < MIN_AUDIO_SAMPLES {
            log::debug!("stt: clip of {} samples too short, skipping", audio.len());
            return Ok(None);
        }

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(self.language.as_deref());
        params.set_n_threads(self.n_threads);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_special(false);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| SttError::ContextInit(e.to_string()))?;
        state
            .full(params, &audio)
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| SttError::Transcription(e.to_string()))?;
        let mut text = String::new();
        for i in 0..n_segments {
            let segment = state
                .full_get_segment_text(i)
                .map_err(|e| SttError::Transcription(format!("segment {i}: {e}")))?;
            text.push_str(&segment);
        }

        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_model_returns_model_not_found() {
        let result = WhisperTranscriber::load("/nonexistent/model.bin", "en", false);
        assert!(matches!(result, Err(SttError::ModelNotFound(_))));
    }

    #[test]
    fn inference_threads_is_bounded() {
        let t = inference_threads();
        assert!((1..=8).contains(&t));
    }
}
