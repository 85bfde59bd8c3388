//! Session history access
//!
//! Turn persistence lives outside this core; the orchestrator only
//! consumes this interface. The in-memory implementation backs the
//! CLI and the tests.

use crate::Result;
use async_trait::async_trait;
use quotemaster_core::ChatTurn;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Read/append access to per-session chat history.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Turns of a session in chronological order. Unknown sessions
    /// are empty, not errors.
    async fn get_history(&self, session_id: &str) -> Vec<ChatTurn>;

    /// Append a completed turn.
    async fn save_turn(&self, turn: ChatTurn) -> Result<()>;
}

/// Process-local session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<ChatTurn>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_history(&self, session_id: &str) -> Vec<ChatTurn> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn save_turn(&self, turn: ChatTurn) -> Result<()> {
        self.sessions
            .write()
            .await
            .entry(turn.session_id.clone())
            .or_default()
            .push(turn);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_get() {
        let store = MemorySessionStore::new();
        assert!(store.get_history("s1").await.is_empty());

        store
            .save_turn(ChatTurn::new("s1", "hello", "hi"))
            .await
            .unwrap();
        store
            .save_turn(ChatTurn::new("s1", "price?", "see table"))
            .await
            .unwrap();

        let history = store.get_history("s1").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].user_message, "hello");
        assert_eq!(store.session_count().await, 1);
    }
}
