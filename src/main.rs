//! Application entry point: voice-chat.
//!
//! # Startup sequence
//!
//! 1. Parse the command line.
//! 2. Initialise logging.
//! 3. Load [`AppConfig`] (defaults on first run) and apply CLI overrides.
//! 4. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 5. Build the collaborators: transcriber, chat agent, voice, input source.
//! 6. Run the [`PipelineOrchestrator`] until input closes or Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::runtime::Runtime;

use voice_chat::{
    config::{AppConfig, AppPaths, InputMode, LlmProvider, VoiceBackend},
    input::{ConsoleInput, InputSource},
    llm::{AnthropicChatAgent, ApiChatAgent, ChatAgent, EchoAgent},
    pipeline::{PipelineOrchestrator, TurnServices},
    speech::{CommandVoice, ConsoleVoice, Voice},
    stt::{SttError, Transcriber},
};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, ValueEnum)]
enum InputArg {
    Text,
    Voice,
}

impl From<InputArg> for InputMode {
    fn from(arg: InputArg) -> Self {
        match arg {
            InputArg::Text => InputMode::Text,
            InputArg::Voice => InputMode::Voice,
        }
    }
}

/// Talk to a chat model by voice or by typing, one turn at a time
#[derive(Parser)]
#[command(name = "voice-chat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Where each turn's input comes from
    #[arg(long, value_enum)]
    input: Option<InputArg>,

    /// Reply language (ISO-639-1, e.g. `en`, `th`)
    #[arg(long)]
    lang: Option<String>,

    /// Settings file to use instead of the platform default
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Chat model name sent to the LLM endpoint
    #[arg(long)]
    model: Option<String>,
}

impl Args {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load_from(path)?,
            None => AppConfig::load().unwrap_or_else(|e| {
                log::warn!("Failed to load config ({e:#}); using defaults");
                AppConfig::default()
            }),
        };

        if let Some(input) = self.input {
            config.input_mode = input.into();
        }
        if let Some(lang) = &self.lang {
            config.language = lang.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // 1. Command line
    let args = Args::parse();

    // 2. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("voice-chat starting up");

    // 3. Configuration
    let config = args.load_config()?;

    // 4. Tokio runtime (2 worker threads; transcription runs on the blocking pool)
    let rt = build_runtime()?;

    let result = rt.block_on(run(config));
    shutdown_runtime(rt);
    result
}

/// How long shutdown waits for blocking-pool tasks before abandoning them.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")
}

/// A stdin read stays parked on the blocking pool until a line arrives, so a
/// plain drop would hang after Ctrl-C.
fn shutdown_runtime(rt: Runtime) {
    rt.shutdown_timeout(SHUTDOWN_GRACE);
}

async fn run(config: AppConfig) -> Result<()> {
    // 5. Collaborators
    let services = TurnServices {
        transcriber: build_transcriber(&config),
        agent: build_agent(&config),
        voice: build_voice(&config)?,
    };
    let input = build_input(&config);

    // 6. Conversation loop, Ctrl-C cancels the active turn and stops
    let orchestrator = PipelineOrchestrator::new(input, services, config.pipeline.clone());
    let stats = orchestrator
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await;

    log::info!("voice-chat finished: {} turns", stats.turns);
    Ok(())
}

// ---------------------------------------------------------------------------
// Collaborator factories
// ---------------------------------------------------------------------------

#[cfg(feature = "whisper")]
fn build_transcriber(config: &AppConfig) -> Arc<dyn Transcriber> {
    use voice_chat::stt::WhisperTranscriber;

    let model_path = AppPaths::new().model_path(&config.stt.model);
    match WhisperTranscriber::load(&model_path, &config.language, config.stt.use_gpu) {
        Ok(engine) => {
            log::info!("Whisper model loaded: {}", model_path.display());
            Arc::new(engine)
        }
        Err(e) => {
            log::warn!(
                "Could not load Whisper model ({}): {e}. Voice turns will be skipped.",
                model_path.display()
            );
            Arc::new(NoModelTranscriber {
                reason: e.to_string(),
            })
        }
    }
}

#[cfg(not(feature = "whisper"))]
fn build_transcriber(config: &AppConfig) -> Arc<dyn Transcriber> {
    if config.input_mode == InputMode::Voice {
        log::warn!(
            "Built without the `whisper` feature; model {} is not used",
            AppPaths::new().model_path(&config.stt.model).display()
        );
    }
    Arc::new(NoModelTranscriber {
        reason: "built without the `whisper` feature".into(),
    })
}

fn build_agent(config: &AppConfig) -> Arc<dyn ChatAgent> {
    match config.llm.provider {
        LlmProvider::Disabled => {
            log::info!("LLM disabled; echoing input");
            Arc::new(EchoAgent)
        }
        LlmProvider::Anthropic => {
            log::info!("Chat model: {} (Anthropic)", config.llm.model);
            Arc::new(AnthropicChatAgent::from_config(&config.llm, &config.language))
        }
        LlmProvider::Ollama | LlmProvider::OpenAiCompatible => {
            log::info!("Chat model: {} at {}", config.llm.model, config.llm.base_url);
            Arc::new(ApiChatAgent::from_config(&config.llm, &config.language))
        }
    }
}

fn build_voice(config: &AppConfig) -> Result<Arc<dyn Voice>> {
    let voice: Arc<dyn Voice> = match config.voice.backend {
        VoiceBackend::Console => Arc::new(ConsoleVoice::stdout()),
        VoiceBackend::Command => Arc::new(
            CommandVoice::new(&config.voice.command).context("invalid [voice] command")?,
        ),
    };
    Ok(voice)
}

#[cfg(feature = "microphone")]
fn build_input(config: &AppConfig) -> Box<dyn InputSource> {
    match config.input_mode {
        InputMode::Text => Box::new(ConsoleInput::stdin()),
        InputMode::Voice => Box::new(voice_chat::input::MicrophoneInput::new(config.audio.clone())),
    }
}

#[cfg(not(feature = "microphone"))]
fn build_input(config: &AppConfig) -> Box<dyn InputSource> {
    if config.input_mode == InputMode::Voice {
        log::warn!("Built without the `microphone` feature; falling back to text input");
    }
    Box::new(ConsoleInput::stdin())
}

// ---------------------------------------------------------------------------
// NoModelTranscriber: stand-in when no speech model is available
// ---------------------------------------------------------------------------

struct NoModelTranscriber {
    reason: String,
}

impl Transcriber for NoModelTranscriber {
    fn transcribe(&self, _samples: &[f32], _sample_rate: u32) -> Result<Option<String>, SttError> {
        Err(SttError::Unavailable(self.reason.clone()))
    }
}
