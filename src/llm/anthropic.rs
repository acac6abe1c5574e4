//! `AnthropicChatAgent`: Anthropic Messages API (`/v1/messages`) client.
//!
//! The system prompt travels in the top-level `system` field; the message
//! list carries only user/assistant turns.  The key comes from
//! `config.api_key`, falling back to `ANTHROPIC_API_KEY`.

use std::sync::{Mutex, PoisonError};

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::llm::agent::{split_fragments, ChatAgent, ChatError, ReplyStream};
use crate::llm::history::{ChatMessage, ConversationHistory};
use crate::llm::prompt::system_prompt;

/// Used when `base_url` was left at the local-server default.
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

pub struct AnthropicChatAgent {
    client: reqwest::Client,
    config: LlmConfig,
    base_url: String,
    api_key: String,
    system_prompt: String,
    history: Mutex<ConversationHistory>,
}

impl AnthropicChatAgent {
    pub fn from_config(config: &LlmConfig, language: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let base_url = if config.base_url == LlmConfig::default().base_url {
            ANTHROPIC_BASE_URL.to_string()
        } else {
            config.base_url.trim_end_matches('/').to_string()
        };
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .unwrap_or_default();
        if api_key.is_empty() {
            log::warn!("llm: no Anthropic API key configured; requests will be rejected");
        }

        Self {
            client,
            config: config.clone(),
            base_url,
            api_key,
            system_prompt: system_prompt(language),
            history: Mutex::new(ConversationHistory::new(config.history_turns)),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    pub fn history_len(&self) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn complete(&self, text: &str) -> Result<String, ChatError> {
        let messages = self
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .dialogue(text);

        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system: &self.system_prompt,
            messages: &messages,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Parse(e.to_string()))?;
        let reply = reply_text(parsed)?;

        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_exchange(text, reply.as_str());

        Ok(reply)
    }
}

/// Concatenate the text blocks of a response; tool blocks are ignored.
fn reply_text(response: MessagesResponse) -> Result<String, ChatError> {
    let text: String = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .collect();
    let text = text.trim();
    if text.is_empty() {
        return Err(ChatError::EmptyResponse);
    }
    Ok(text.to_string())
}

impl ChatAgent for AnthropicChatAgent {
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
