//! Conversation history forming the chat prompt context

use serde::{Deserialize, Serialize};

/// Message author role, matching the chat API wire format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt
    System,
    /// Spoken user input
    User,
    /// Model reply
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single role-tagged message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Author role
    pub role: Role,
    /// Message text
    pub content: String,
}

impl Message {
    /// Create a message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Append-only ordered conversation history
///
/// Insertion order is conversational order; messages are never reordered or
/// removed except by [`ConversationContext::reset`]. The history grows
/// without bound over a session — there is no trimming or windowing.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    messages: Vec<Message>,
}

impl ConversationContext {
    /// Create a context seeded with a single system message
    #[must_use]
    pub fn with_system_prompt(prompt: &str) -> Self {
        Self {
            messages: vec![Message::new(Role::System, prompt)],
        }
    }

    /// Append a message at the end of the history
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace the entire history with a single system message
    pub fn reset(&mut self, system_prompt: &str) {
        self.messages.clear();
        self.messages.push(Message::new(Role::System, system_prompt));
    }

    /// The full ordered history
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages in the history
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the history is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order() {
        let mut ctx = ConversationContext::with_system_prompt("be brief");
        ctx.append(Message::new(Role::User, "hello"));
        ctx.append(Message::new(Role::Assistant, "hi"));

        let roles: Vec<Role> = ctx.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
    }

    #[test]
    fn reset_yields_single_system_message() {
        let mut ctx = ConversationContext::with_system_prompt("old");
        for i in 0..10 {
            ctx.append(Message::new(Role::User, format!("q{i}")));
            ctx.append(Message::new(Role::Assistant, format!("a{i}")));
        }
        assert_eq!(ctx.len(), 21);

        ctx.reset("new prompt");
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.messages()[0].role, Role::System);
        assert_eq!(ctx.messages()[0].content, "new prompt");
    }

    #[test]
    fn role_serializes_lowercase() {
        let msg = Message::new(Role::Assistant, "ok");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);
    }
}
