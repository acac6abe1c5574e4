//! `ApiChatAgent`: OpenAI-compatible `/v1/chat/completions` client.
//!
//! Works with Ollama (OpenAI mode), OpenAI, Groq, LM Studio, vLLM, and any
//! other provider that speaks the chat-completions wire format.  All
//! connection details come from [`LlmConfig`]; nothing is hardcoded.

use std::sync::{Mutex, PoisonError};

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::config::LlmConfig;
use crate::llm::agent::{split_fragments, ChatAgent, ChatError, ReplyStream};
use crate::llm::history::{ChatMessage, ConversationHistory};
use crate::llm::prompt::system_prompt;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    temperature: f32,
    max_tokens: u32,
}

/// Chat agent backed by a remote or local model server.
///
/// The reply is requested in one piece and split into paragraphs with
/// [`split_fragments`], so speech can start on the first paragraph while the
/// rest is still queued.
pub struct ApiChatAgent {
    client: reqwest::Client,
    config: LlmConfig,
    system_prompt: String,
    history: Mutex<ConversationHistory>,
}

impl ApiChatAgent {
    /// Build an agent replying in `language`.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`; if the builder fails a default client is used.
    pub fn from_config(config: &LlmConfig, language: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
            system_prompt: system_prompt(language),
            history: Mutex::new(ConversationHistory::new(config.history_turns)),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Number of exchanges currently remembered.
    pub fn history_len(&self) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Send `text` with the current history and return the full reply.
    ///
    /// The `Authorization: Bearer …` header is attached only when
    /// `config.api_key` is non-empty.
    async fn complete(&self, text: &str) -> Result<String, ChatError> {
        let messages = self
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .messages(&self.system_prompt, text);

        let body = CompletionRequest {
            model: &self.config.model,
            messages: &messages,
            stream: false,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let mut req = self.client.post(self.endpoint()).json(&body);
        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ChatError::Parse(e.to_string()))?;
        let reply = parse_reply(&json)?;

        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_exchange(text, reply.as_str());

        Ok(reply)
    }
}

/// Extract `choices[0].message.content` from a completion response.
fn parse_reply(json: &serde_json::Value) -> Result<String, ChatError> {
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or(ChatError::EmptyResponse)?
        .trim();
    if content.is_empty() {
        return Err(ChatError::EmptyResponse);
    }
    Ok(content.to_string())
}

impl ChatAgent for ApiChatAgent {
    fn respond<'a>(&'a self, text: &'a str) -> ReplyStream<'a> {
        let fragments = stream::once(async move {
            let items: Vec<Result<String, ChatError>> = match self.complete(text).await {
                Ok(reply) => split_fragments(&reply).into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            };
            stream::iter(items)
        })
        .flatten();
        Box::pin(fragments)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::config::LlmProvider;

    fn make_config(base_url: &str, api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider: LlmProvider::OpenAiCompatible,
            base_url: base_url.into(),
            api_key: api_key.map(str::to_string),
            model: "qwen2.5:3b".into(),
            temperature: 0.3,
            max_tokens: 64,
            timeout_secs: 2,
            history_turns: 4,
        }
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let agent = ApiChatAgent::from_config(&make_config("http://localhost:11434/", None), "en");
        assert_eq!(agent.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn agent_is_object_safe() {
        let agent: Box<dyn ChatAgent> =
            Box::new(ApiChatAgent::from_config(&make_config("http://x", Some("sk")), "en"));
        drop(agent);
    }

    #[test]
    fn parse_reply_reads_first_choice() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "  Hi there.\n" } }]
        });
        assert_eq!(parse_reply(&json).unwrap(), "Hi there.");
    }

    #[test]
    fn parse_reply_rejects_empty_content() {
        let blank = serde_json::json!({ "choices": [{ "message": { "content": "   " } }] });
        assert!(matches!(parse_reply(&blank), Err(ChatError::EmptyResponse)));
        let missing = serde_json::json!({ "error": "nope" });
        assert!(matches!(parse_reply(&missing), Err(ChatError::EmptyResponse)));
    }

    #[test]
    fn request_body_shape() {
        let msgs = vec![ChatMessage::new(crate::llm::Role::User, "hi")];
        let body = CompletionRequest {
            model: "m",
            messages: &msgs,
            stream: false,
            temperature: 0.5,
            max_tokens: 10,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["stream"], false);
    }

    /// Nothing listens on port 9 (discard); the stream must end with exactly
    /// one error and leave the history untouched.
    #[tokio::test]
    async fn unreachable_server_yields_single_error() {
        let agent = ApiChatAgent::from_config(&make_config("http://127.0.0.1:9", None), "en");
        let items: Vec<_> = agent.respond("hello").collect().await;
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
        assert_eq!(agent.history_len(), 0);
    }
}
