//! Chat agents that answer the user.
//!
//! This module provides:
//! * [`ChatAgent`]: trait implemented by every backend; yields a stream of
//!   reply fragments.
//! * [`ApiChatAgent`]: OpenAI-compatible REST backend (Ollama, OpenAI …).
//! * [`AnthropicChatAgent`]: Anthropic Messages API backend.
//! * [`EchoAgent`]: offline backend used when the LLM is disabled.
//! * [`ConversationHistory`]: rolling window of previous exchanges.
//! * [`system_prompt`]: per-language system prompt.
//! * [`ChatError`]: error variants for chat requests.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use voice_chat::config::AppConfig;
//! use voice_chat::llm::{ApiChatAgent, ChatAgent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let agent = ApiChatAgent::from_config(&config.llm, &config.language);
//!
//!     let mut reply = agent.respond("What should I cook tonight?");
//!     while let Some(fragment) = reply.next().await {
//!         println!("{}", fragment.unwrap());
//!     }
//! }
//! ```

pub mod agent;
pub mod anthropic;
pub mod api;
pub mod history;
pub mod prompt;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use agent::{split_fragments, ChatAgent, ChatError, EchoAgent, ReplyStream};
pub use anthropic::AnthropicChatAgent;
pub use api::ApiChatAgent;
pub use history::{ChatMessage, ConversationHistory, Role};
pub use prompt::system_prompt;

#[cfg(test)]
pub use agent::ScriptedAgent;
