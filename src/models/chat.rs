use serde::{ Serialize, Deserialize };
use std::fmt;

/// Author of a message as seen by the caller. The provider exchange uses
/// additional roles (system, tool) that never leave the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Ordered message history supplied by the caller on every request.
/// Append-only from the caller's perspective; the server never stores it.
pub type Conversation = Vec<ChatMessage>;

/// Reference to a generated image, resolved at most once per exchange.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    }

    #[test]
    fn message_round_trips() {
        let msg: ChatMessage = serde_json::from_str(r#"{"role":"user","content":"Draw a cat"}"#).unwrap();
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Draw a cat");
    }
}
