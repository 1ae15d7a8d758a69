use serde_json::{Map, Value};

/// Error body the backend attaches to non-2xx responses.
///
/// The backend reports failures as `{"detail": "..."}` and occasionally as
/// `{"detail": {"message": "..."}}`.
#[derive(Debug, Clone, Default)]
pub struct ErrorBody {
    detail: Option<Value>,
}

impl ErrorBody {
    /// Parses an error body, returning `None` if it is not a JSON object.
    ///
    /// Arrays are rejected even though they would bind to a struct positionally.
    pub fn parse(body: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(body).ok()? {
            Value::Object(map) => Some(Self::from_object(map)),
            _ => None,
        }
    }

    fn from_object(mut map: Map<String, Value>) -> Self {
        Self {
            detail: map.remove("detail"),
        }
    }

    /// Returns the human-readable message, if the body carries a non-empty one.
    pub fn message(&self) -> Option<String> {
        let text = match self.detail.as_ref()? {
            Value::String(s) => s.as_str(),
            Value::Object(map) => map.get("message")?.as_str()?,
            _ => return None,
        };
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

/// Extracts the human-readable message from a raw error body.
pub fn extract_detail(body: &str) -> Option<String> {
    ErrorBody::parse(body)?.message()
}
