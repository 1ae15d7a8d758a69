use serde::{Deserialize, Serialize};

/// Banner returned by the backend's root endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Service name.
    pub message: String,

    /// Deployed backend version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}
