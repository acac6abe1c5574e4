//! Core `ChatAgent` trait, its error type and the offline `EchoAgent`.
//!
//! A chat agent answers one user message with a stream of reply fragments.
//! The respond worker forwards each fragment to the speak worker as soon as
//! it arrives, so an agent that splits its reply lets speech start before
//! the whole answer is known.

use std::pin::Pin;

use futures::stream::{self, Stream};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ChatError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum ChatError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("chat request timed out")]
    Timeout,

    /// The endpoint answered with a non-success status.
    #[error("chat endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse chat response: {0}")]
    Parse(String),

    /// The model returned no usable text.
    #[error("chat model returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChatError::Timeout
        } else {
            ChatError::Request(e.to_string())
        }
    }
}

/// Reply fragments, in speaking order.  May end with an `Err` after some
/// `Ok` fragments.
pub type ReplyStream<'a> = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send + 'a>>;

// ---------------------------------------------------------------------------
// ChatAgent trait
// ---------------------------------------------------------------------------

/// Produces the assistant's reply to one user message.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn ChatAgent>` across turns.  Dropping the returned stream must be
/// enough to abandon an in-flight request.
pub trait ChatAgent: Send + Sync {
    fn respond<'a>(&'a self, text: &'a str) -> ReplyStream<'a>;
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn ChatAgent>) {}
};

/// Split a reply into speakable fragments on line breaks.
///
/// Runs of newlines collapse, surrounding whitespace is trimmed and empty
/// pieces are dropped.
///
/// ```
/// use voice_chat::llm::split_fragments;
///
/// let parts = split_fragments("Sure!\n\nFirst, breathe.\n  Then relax.  \n");
/// assert_eq!(parts, vec!["Sure!", "First, breathe.", "Then relax."]);
/// ```
pub fn split_fragments(reply: &str) -> Vec<String> {
    reply
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// EchoAgent
// ---------------------------------------------------------------------------

/// Offline agent used when no model is configured: repeats the user.
#[derive(Debug, Default, Clone)]
pub struct EchoAgent;

impl ChatAgent for EchoAgent {
    fn respond<'a>(&'a self, text: &'a str) -> ReplyStream<'a> {
        let reply = format!("You said: {}", text.trim());
        Box::pin(stream::iter(vec![Ok(reply)]))
    }
}

// ---------------------------------------------------------------------------
// ScriptedAgent  (test-only)
// ---------------------------------------------------------------------------

/// Replays a fixed list of items for every message and records what it was
/// asked.
#[cfg(test)]
pub struct ScriptedAgent {
    items: Vec<Result<String, ChatError>>,
    pub prompts: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl ScriptedAgent {
    pub fn new(items: Vec<Result<String, ChatError>>) -> Self {
        Self {
            items,
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn fragments(parts: &[&str]) -> Self {
        Self::new(parts.iter().map(|p| Ok(p.to_string())).collect())
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl ChatAgent for ScriptedAgent {
    fn respond<'a>(&'a self, text: &'a str) -> ReplyStream<'a> {
        self.prompts.lock().unwrap().push(text.to_string());
        Box::pin(stream::iter(self.items.clone()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn echo_agent_repeats_user() {
        let agent = EchoAgent;
        let out: Vec<_> = agent.respond("  hello ").collect().await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_deref().unwrap(), "You said: hello");
    }

    #[tokio::test]
    async fn scripted_agent_replays_errors_in_place() {
        let agent = ScriptedAgent::new(vec![
            Ok("one".into()),
            Err(ChatError::EmptyResponse),
        ]);
        let out: Vec<_> = agent.respond("hi").collect().await;
        assert!(out[0].is_ok());
        assert!(matches!(out[1], Err(ChatError::EmptyResponse)));
        assert_eq!(agent.prompts(), vec!["hi".to_string()]);
    }

    #[test]
    fn split_fragments_handles_blank_input() {
        assert!(split_fragments("").is_empty());
        assert!(split_fragments("\n\n  \n").is_empty());
        assert_eq!(split_fragments("single line"), vec!["single line"]);
    }

    #[test]
    fn chat_error_display() {
        let e = ChatError::Status {
            status: 503,
            body: "busy".into(),
        };
        assert_eq!(e.to_string(), "chat endpoint returned HTTP 503: busy");
    }
}
