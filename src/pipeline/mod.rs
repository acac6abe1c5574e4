//! Turn-coordinated conversation pipeline.
//!
//! This module wires input → transcription → chat → speech for one turn at a
//! time and tears each turn down before the next one starts.
//!
//! # Architecture
//!
//! ```text
//! InputSource::receive(ready)
//!        │
//!        ▼
//! PipelineOrchestrator::run()           ← async loop, one turn at a time
//!        │
//!        └─ TurnController (fresh per turn)
//!              │
//!              ├─ transcribe_worker   audio mailbox → Transcriber → text mailbox
//!              ├─ respond_worker      text mailbox  → ChatAgent   → reply queue
//!              └─ speak_worker        reply queue   → Voice       → complete()
//!
//! TurnScope drop → cleanup() → ready.set() → next turn
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voice_chat::config::AppConfig;
//! use voice_chat::input::ConsoleInput;
//! use voice_chat::llm::ApiChatAgent;
//! use voice_chat::pipeline::{PipelineOrchestrator, TurnServices};
//! use voice_chat::speech::ConsoleVoice;
//! # use voice_chat::stt::Transcriber;
//! # fn make_transcriber() -> Arc<dyn Transcriber> { unimplemented!() }
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let services = TurnServices {
//!         transcriber: make_transcriber(),
//!         agent: Arc::new(ApiChatAgent::from_config(&config.llm, &config.language)),
//!         voice: Arc::new(ConsoleVoice::stdout()),
//!     };
//!
//!     let orchestrator = PipelineOrchestrator::new(
//!         Box::new(ConsoleInput::stdin()),
//!         services,
//!         config.pipeline.clone(),
//!     );
//!     orchestrator.run(std::future::pending()).await;
//! }
//! ```

pub mod controller;
pub mod runner;
pub mod stages;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use controller::{AudioSamples, TurnController, TurnError, TurnInput, TurnScope};
pub use runner::{PipelineOrchestrator, RunStats};
pub use stages::{
    input_worker, respond_worker, run_turn, speak_worker, transcribe_worker, SpeakReport,
    StageError, TurnServices, TurnSummary,
};
pub use state::{Stage, TurnState};
