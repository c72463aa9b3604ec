//! Session files for conversation history
//!
//! A session is saved either as a binary snapshot that restores the exact
//! history, or as a JSON export meant for reading.

pub mod manager;
pub mod snapshot;
pub mod store;

pub use manager::SessionManager;
pub use store::{ChatHistory, ChatTurn, Part, Role};
