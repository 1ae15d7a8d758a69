use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

const FALLBACK_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Body returned by `POST /api/chat/session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCreated {
    /// The identifier to correlate subsequent queries with.
    pub session_id: String,

    /// Creation time as reported by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Whether the backend considers the session active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Body returned by `GET /api/chat/session/{session_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// The identifier that was looked up.
    pub session_id: String,

    /// Creation time as reported by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Time of the last query in this session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,

    /// Whether the backend considers the session active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    /// Prior queries, in whatever shape the backend stores them.
    #[serde(default)]
    pub query_history: Vec<serde_json::Value>,
}

/// Identifier a chat session sends with every query.
///
/// A `Fallback` identifier is minted locally when the backend could not
/// create a session.  It is only weakly unique and the backend may treat it
/// as a fresh anonymous session or reject it outright.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "origin", content = "id", rename_all = "snake_case")]
pub enum SessionId {
    /// Issued by the backend.
    Remote(String),

    /// Generated locally as `session_<unix-millis>_<random>`.
    Fallback(String),
}

impl SessionId {
    /// Mints a fallback identifier from the current time.
    pub fn fallback() -> Self {
        let millis = time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        Self::fallback_at(millis, &mut rand::thread_rng())
    }

    /// Mints a fallback identifier for the given millisecond timestamp.
    pub fn fallback_at<R: Rng + ?Sized>(unix_millis: i128, rng: &mut R) -> Self {
        let suffix: String = (0..FALLBACK_SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        SessionId::Fallback(format!("session_{unix_millis}_{suffix}"))
    }

    /// Returns the identifier as sent on the wire.
    pub fn as_str(&self) -> &str {
        match self {
            SessionId::Remote(id) | SessionId::Fallback(id) => id,
        }
    }

    /// Returns true if the identifier was generated locally.
    pub fn is_fallback(&self) -> bool {
        matches!(self, SessionId::Fallback(_))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
