//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Every section is `#[serde(default)]`, so a partial `settings.toml` only
//! overrides the keys it names.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// InputMode
// ---------------------------------------------------------------------------

/// Where each turn's input comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InputMode {
    /// Typed lines on stdin.
    #[default]
    Text,
    /// Utterances from the default microphone (needs the `microphone`
    /// feature).
    Voice,
}

// ---------------------------------------------------------------------------
// LlmProvider
// ---------------------------------------------------------------------------

/// Selects which chat backend answers the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LlmProvider {
    /// Ollama running locally (OpenAI mode); no authentication required.
    #[default]
    Ollama,
    /// Any OpenAI-compatible REST API (OpenAI, Groq, LM Studio …).
    OpenAiCompatible,
    /// Anthropic Messages API.  `base_url` left at the local default points
    /// at `https://api.anthropic.com`; the key falls back to
    /// `ANTHROPIC_API_KEY`.
    Anthropic,
    /// No model: the offline echo agent answers instead.
    Disabled,
}

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// Base URL of the API endpoint.
    ///
    /// - Ollama default: `http://localhost:11434`
    /// - OpenAI: `https://api.openai.com`
    pub base_url: String,
    /// API key, `None` for local providers.
    pub api_key: Option<String>,
    /// Model identifier sent to the API (e.g. `"qwen2.5:3b"`, `"gpt-4o-mini"`).
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Maximum seconds to wait for one reply before giving up.
    pub timeout_secs: u64,
    /// Previous exchanges (user + assistant pairs) sent along with each
    /// request.  Kept in memory only.
    pub history_turns: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            base_url: "http://localhost:11434".into(),
            api_key: None,
            model: "qwen2.5:3b".into(),
            temperature: 0.7,
            max_tokens: 512,
            timeout_secs: 60,
            history_turns: 8,
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the Whisper transcriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// GGML model file name, resolved against [`AppPaths::models_dir`]
    /// unless it is an absolute path.
    pub model: String,
    pub use_gpu: bool,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "ggml-base.bin".into(),
            use_gpu: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Utterance detection settings for voice input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// RMS level above which a chunk counts as speech.
    pub silence_threshold: f32,
    /// Seconds of silence after speech that end an utterance.
    pub silence_duration_secs: f32,
    /// Utterances shorter than this are discarded as noise.
    pub min_speech_secs: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 0.015,
            silence_duration_secs: 1.5,
            min_speech_secs: 1.5,
        }
    }
}

// ---------------------------------------------------------------------------
// VoiceConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum VoiceBackend {
    /// Print reply fragments to stdout.
    #[default]
    Console,
    /// Run an external TTS command per fragment.
    Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub backend: VoiceBackend,
    /// Program and leading arguments; the fragment is appended as the last
    /// argument (e.g. `["espeak-ng", "-v", "en"]`).
    pub command: Vec<String>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            backend: VoiceBackend::default(),
            command: vec!["say".into()],
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Turn supervision settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How often the speak worker re-checks the batch-complete marker while
    /// the reply queue is empty.
    pub speak_poll_ms: u64,
    /// A turn that has not finished after this many seconds is cancelled.
    /// `0` disables the watchdog.
    pub turn_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            speak_poll_ms: 100,
            turn_timeout_secs: 120,
        }
    }
}

impl PipelineConfig {
    pub fn speak_poll(&self) -> Duration {
        Duration::from_millis(self.speak_poll_ms.max(1))
    }

    pub fn turn_timeout(&self) -> Option<Duration> {
        (self.turn_timeout_secs > 0).then(|| Duration::from_secs(self.turn_timeout_secs))
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voice_chat::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub input_mode: InputMode,
    /// Language the assistant replies in (ISO-639-1, e.g. `"en"`).  Also
    /// passed to Whisper.
    pub language: String,
    pub llm: LlmConfig,
    pub stt: SttConfig,
    pub audio: AudioConfig,
    pub voice: VoiceConfig,
    pub pipeline: PipelineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_mode: InputMode::default(),
            language: "en".into(),
            llm: LlmConfig::default(),
            stt: SttConfig::default(),
            audio: AudioConfig::default(),
            voice: VoiceConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
