//! Base trait for remote chat models

use async_trait::async_trait;
use gemchat_core::session::ChatTurn;
use thiserror::Error;

/// Error type for provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Response blocked: {0}")]
    Blocked(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProviderError {
    /// Whether the remote side rejected the credential
    pub fn is_auth(&self) -> bool {
        matches!(self, ProviderError::ApiError { status, .. } if *status == 401 || *status == 403)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// A remote chat model.
///
/// `generate` receives the full conversation, oldest turn first, with the
/// new user turn last, and returns the model's reply turn.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn generate(&self, contents: &[ChatTurn]) -> ProviderResult<ChatTurn>;

    /// Name of the model requests are sent to
    fn model(&self) -> String;
}
