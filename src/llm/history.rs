//! Rolling in-memory conversation history.
//!
//! [`ConversationHistory`] keeps the last *N* user/assistant exchanges so
//! follow-up questions make sense to the model.  Nothing is persisted; a new
//! process starts with an empty history.

use std::collections::VecDeque;

use serde::Serialize;

/// Chat-completions message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message on the chat-completions wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Bounded window of past exchanges.
///
/// # Example
/// ```rust
/// use voice_chat::llm::{ConversationHistory, Role};
///
/// let mut history = ConversationHistory::new(1);
/// history.push_exchange("hi", "hello!");
/// history.push_exchange("how are you?", "fine.");
///
/// let msgs = history.messages("be brief", "bye");
/// assert_eq!(msgs.len(), 4); // system + 1 kept exchange + new user message
/// assert_eq!(msgs[1].content, "how are you?");
/// assert_eq!(msgs[3].role, Role::User);
/// ```
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    exchanges: VecDeque<(String, String)>,
    max_exchanges: usize,
}

impl ConversationHistory {
    pub fn new(max_exchanges: usize) -> Self {
        Self {
            exchanges: VecDeque::with_capacity(max_exchanges + 1),
            max_exchanges,
        }
    }

    /// Record a completed exchange, dropping the oldest beyond the window.
    pub fn push_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        if self.max_exchanges == 0 {
            return;
        }
        self.exchanges.push_back((user.into(), assistant.into()));
        while self.exchanges.len() > self.max_exchanges {
            self.exchanges.pop_front();
        }
    }

    /// Full request message list: system prompt, history, then `user`.
    pub fn messages(&self, system: &str, user: &str) -> Vec<ChatMessage> {
        let mut msgs = Vec::with_capacity(self.exchanges.len() * 2 + 2);
        msgs.push(ChatMessage::new(Role::System, system));
        msgs.extend(self.dialogue(user));
        msgs
    }

    /// History then `user`, without a system message.
    pub fn dialogue(&self, user: &str) -> Vec<ChatMessage> {
        let mut msgs = Vec::with_capacity(self.exchanges.len() * 2 + 1);
        for (u, a) in &self.exchanges {
            msgs.push(ChatMessage::new(Role::User, u.as_str()));
            msgs.push(ChatMessage::new(Role::Assistant, a.as_str()));
        }
        msgs.push(ChatMessage::new(Role::User, user));
        msgs
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_drops_oldest() {
        let mut h = ConversationHistory::new(2);
        h.push_exchange("a", "1");
        h.push_exchange("b", "2");
        h.push_exchange("c", "3");
        assert_eq!(h.len(), 2);
        let msgs = h.messages("sys", "d");
        let users: Vec<_> = msgs
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(users, vec!["b", "c", "d"]);
    }

    #[test]
    fn zero_window_keeps_nothing() {
        let mut h = ConversationHistory::new(0);
        h.push_exchange("a", "1");
        assert!(h.is_empty());
        assert_eq!(h.messages("sys", "x").len(), 2);
    }

    #[test]
    fn dialogue_alternates_without_system() {
        let mut h = ConversationHistory::new(2);
        h.push_exchange("a", "1");
        let roles: Vec<_> = h.dialogue("b").iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        assert_eq!(h.messages("sys", "b")[1..], h.dialogue("b")[..]);
    }

    #[test]
    fn clear_empties_history() {
        let mut h = ConversationHistory::new(3);
        h.push_exchange("a", "1");
        h.clear();
        assert!(h.is_empty());
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::new(Role::Assistant, "ok")).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "ok");
    }
}
