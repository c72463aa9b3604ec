//! Remote chat model integrations for gemchat
//!
//! The relay depends only on [`ChatProvider`]; [`GeminiClient`] is the
//! implementation backed by the Gemini REST API.

pub mod base;
pub mod gemini;
pub mod session;

pub use base::{ChatProvider, ProviderError, ProviderResult};
pub use gemini::GeminiClient;
pub use session::{ChatSession, RelayError};
