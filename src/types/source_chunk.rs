use serde::{Deserialize, Serialize};

/// A passage the backend cites as evidence for an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceChunk {
    /// Title of the chapter or section the passage comes from.
    pub title: String,

    /// The passage itself.
    pub text: String,

    /// Backend identifier of the indexed chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
}

impl SourceChunk {
    /// Create a new `SourceChunk` without a content identifier.
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            content_id: None,
        }
    }
}
