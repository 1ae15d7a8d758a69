use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::SourceChunk;

/// Who authored a chat message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The person typing into the widget.
    User,

    /// The backend, or the widget speaking on its behalf after a failure.
    Bot,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Bot => write!(f, "bot"),
        }
    }
}

/// One entry in a chat transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Display key; unique within one widget only.
    pub id: u64,

    /// Message body.
    pub text: String,

    /// Author of the message.
    pub sender: Sender,

    /// When the message was appended.
    #[serde(with = "crate::utils::time")]
    pub timestamp: OffsetDateTime,

    /// Citations attached to a bot answer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceChunk>,
}

impl Message {
    /// Create a user message stamped with the current time.
    pub fn user(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            sender: Sender::User,
            timestamp: crate::utils::time::now(),
            sources: Vec::new(),
        }
    }

    /// Create a bot message stamped with the current time.
    pub fn bot(id: u64, text: impl Into<String>, sources: Vec<SourceChunk>) -> Self {
        Self {
            id,
            text: text.into(),
            sender: Sender::Bot,
            timestamp: crate::utils::time::now(),
            sources,
        }
    }

    /// Returns true if the message has citations to show.
    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }
}
