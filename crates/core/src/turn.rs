//! Chat turns - one user/assistant exchange in a session

use crate::AssembledContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
            ChatRole::System => write!(f, "system"),
        }
    }
}

/// One completed exchange: the user message, the assistant reply, and
/// the context that produced it. Persisted by the session layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Session this turn belongs to
    pub session_id: String,

    /// What the user asked
    pub user_message: String,

    /// What the assistant replied
    pub assistant_message: String,

    /// Context block that was included in the prompt
    #[serde(default)]
    pub context_used: AssembledContext,

    /// When the turn completed
    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    /// Create a new turn
    pub fn new(
        session_id: impl Into<String>,
        user_message: impl Into<String>,
        assistant_message: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_message: user_message.into(),
            assistant_message: assistant_message.into(),
            context_used: AssembledContext::empty(),
            created_at: Utc::now(),
        }
    }

    /// Builder: attach the context used for this turn
    pub fn with_context(mut self, context: AssembledContext) -> Self {
        self.context_used = context;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_creation() {
        let turn = ChatTurn::new("sess-1", "How much for a website?", "See the table below.");

        assert_eq!(turn.session_id, "sess-1");
        assert!(turn.context_used.is_empty());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(ChatRole::User.to_string(), "user");
        assert_eq!(ChatRole::Assistant.to_string(), "assistant");
    }
}
