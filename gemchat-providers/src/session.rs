//! History-owning chat session

use gemchat_core::session::{ChatHistory, ChatTurn};
use gemchat_core::utils::truncate;
use std::sync::Arc;
use tracing::debug;

use crate::base::{ChatProvider, ProviderError};

/// Failure relaying a message to the remote model
pub type RelayError = ProviderError;

/// A conversation with a remote model.
///
/// Owns the history: each successful `send_message` appends the user turn
/// and the model's reply. A failed relay leaves the history untouched.
pub struct ChatSession {
    provider: Arc<dyn ChatProvider>,
    history: ChatHistory,
}

impl ChatSession {
    /// Start a session, optionally with restored history
    pub fn new(provider: Arc<dyn ChatProvider>, history: ChatHistory) -> Self {
        Self { provider, history }
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn model(&self) -> String {
        self.provider.model()
    }

    /// Relay `text` to the model and return the reply text
    pub async fn send_message(&mut self, text: &str) -> Result<String, RelayError> {
        let user_turn = ChatTurn::user(text);
        let mut contents = Vec::with_capacity(self.history.len() + 1);
        contents.extend(self.history.iter().cloned());
        contents.push(user_turn.clone());

        debug!("Relaying message: {}", truncate(text, 80));
        let reply = self.provider.generate(&contents).await?;
        let reply_text = reply.text();

        self.history.push(user_turn);
        self.history.push(reply);
        Ok(reply_text)
    }

    /// End the session and hand back its history
    pub fn into_history(self) -> ChatHistory {
        self.history
    }
}
