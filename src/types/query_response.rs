use serde::{Deserialize, Serialize};

use crate::types::SourceChunk;

/// Successful body of `POST /api/chat/query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// The answer text.
    pub response_text: String,

    /// Citations backing the answer; absent and `null` both mean none.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub source_chunks: Vec<SourceChunk>,

    /// Identifier the backend assigned to this query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,

    /// Backend's confidence in the answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,

    /// True when the backend could not ground the answer in the book.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_fallback: Option<bool>,
}

impl QueryResponse {
    /// Create a new `QueryResponse` with no citations.
    pub fn new(response_text: impl Into<String>) -> Self {
        Self {
            response_text: response_text.into(),
            source_chunks: Vec::new(),
            query_id: None,
            confidence_score: None,
            is_fallback: None,
        }
    }

    /// Set the citations.
    pub fn with_source_chunks(mut self, source_chunks: Vec<SourceChunk>) -> Self {
        self.source_chunks = source_chunks;
        self
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<SourceChunk>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<SourceChunk>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_response() {
        let response: QueryResponse =
            serde_json::from_str(r#"{"response_text": "Chapter 2 covers architecture."}"#)
                .unwrap();
        assert_eq!(response.response_text, "Chapter 2 covers architecture.");
        assert!(response.source_chunks.is_empty());
        assert!(response.query_id.is_none());
    }

    #[test]
    fn null_sources_are_empty() {
        let response: QueryResponse =
            serde_json::from_str(r#"{"response_text": "x", "source_chunks": null}"#).unwrap();
        assert!(response.source_chunks.is_empty());
    }

    #[test]
    fn full_backend_response() {
        let body = r#"{
            "id": "r-1",
            "query_id": "q-1",
            "response_text": "Ownership moves values.",
            "source_chunks": [
                {"content_id": "c-1", "title": "Chapter 4", "text": "Each value has an owner."},
                {"content_id": "c-2", "title": "Chapter 5", "text": "Borrowing lends access."}
            ],
            "confidence_score": 0.82,
            "is_fallback": false,
            "timestamp": "2024-01-01T00:00:00Z"
        }"#;
        let response: QueryResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.source_chunks.len(), 2);
        assert_eq!(response.source_chunks[1].title, "Chapter 5");
        assert_eq!(response.query_id.as_deref(), Some("q-1"));
        assert_eq!(response.confidence_score, Some(0.82));
        assert_eq!(response.is_fallback, Some(false));
    }
}
