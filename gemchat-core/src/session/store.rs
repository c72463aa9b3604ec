//! Conversation data structures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a turn, named the way the remote API names them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One piece of turn content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

/// One message in the conversation, from the user or the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl ChatTurn {
    /// Create a single-part user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_text(Role::User, text)
    }

    /// Create a single-part model turn
    pub fn model(text: impl Into<String>) -> Self {
        Self::with_text(Role::Model, text)
    }

    pub fn with_text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part { text: text.into() }],
        }
    }

    /// Concatenated text of all parts
    pub fn text(&self) -> String {
        self.parts.iter().map(|p| p.text.as_str()).collect()
    }
}

/// Ordered conversation history.
///
/// Turns are only ever appended; insertion order is conversation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatHistory {
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn to the end of the history
    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChatTurn> {
        self.turns.iter()
    }

    /// Plain JSON mappings, one per turn, in conversation order
    pub fn to_json_records(&self) -> serde_json::Result<Vec<serde_json::Value>> {
        self.turns.iter().map(serde_json::to_value).collect()
    }
}

impl From<Vec<ChatTurn>> for ChatHistory {
    fn from(turns: Vec<ChatTurn>) -> Self {
        Self { turns }
    }
}

impl<'a> IntoIterator for &'a ChatHistory {
    type Item = &'a ChatTurn;
    type IntoIter = std::slice::Iter<'a, ChatTurn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}
