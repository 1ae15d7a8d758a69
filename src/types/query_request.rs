use serde::{Deserialize, Serialize};

use crate::types::QueryType;

/// Body of `POST /api/chat/query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The user's question, exactly as typed.
    pub query_text: String,

    /// Whether the question is scoped to a selection.
    pub query_type: QueryType,

    /// The selected passage; serialized as `null` when absent.
    pub selected_text: Option<String>,

    /// The session the query belongs to.
    pub session_id: String,
}

impl QueryRequest {
    /// Builds a query, deriving its type from the presence of a selection.
    pub fn new(
        query_text: impl Into<String>,
        selected_text: Option<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            query_text: query_text.into(),
            query_type: QueryType::for_selection(selected_text.as_deref()),
            selected_text,
            session_id: session_id.into(),
        }
    }
}
