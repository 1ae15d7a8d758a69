//! Error types for the book assistant client.
//!
//! Every failure the backend client can produce is an [`Error`].  The chat
//! session never lets one escape to the user; it converts them into bot
//! messages instead.

use std::error;
use std::fmt;
use std::io;
use std::sync::Arc;

/// The main error type for the book assistant client.
#[derive(Clone, Debug)]
pub enum Error {
    /// A non-2xx response with a status code not covered by another variant.
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Human-readable message extracted from the error body, if any.
        detail: Option<String>,
    },

    /// The backend rejected the request (HTTP 400 or 422).
    BadRequest {
        /// HTTP status code.
        status_code: u16,
        /// Human-readable message extracted from the error body, if any.
        detail: Option<String>,
    },

    /// The backend does not know the requested resource (HTTP 404).
    NotFound {
        /// Human-readable message extracted from the error body, if any.
        detail: Option<String>,
    },

    /// Rate limit exceeded (HTTP 429).
    RateLimit {
        /// Human-readable message extracted from the error body, if any.
        detail: Option<String>,
        /// Time to wait before retrying, in seconds.
        retry_after: Option<u64>,
    },

    /// The backend failed internally (HTTP 500).
    InternalServer {
        /// Human-readable message extracted from the error body, if any.
        detail: Option<String>,
    },

    /// The backend is overloaded or not configured (HTTP 502-504).
    ServiceUnavailable {
        /// HTTP status code.
        status_code: u16,
        /// Human-readable message extracted from the error body, if any.
        detail: Option<String>,
        /// Time to wait before retrying, in seconds.
        retry_after: Option<u64>,
    },

    /// The request did not finish within the configured timeout.
    Timeout {
        /// Human-readable error message.
        message: String,
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// The backend could not be reached.
    Connection {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Any other failure inside the HTTP client.
    HttpClient {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Error during JSON or YAML serialization or deserialization.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// I/O error.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// A request was rejected locally before being sent.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },

    /// A URL parsing or manipulation error.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },
}

impl Error {
    /// Creates an error from an HTTP status code and the detail extracted from its body.
    pub fn from_status(status_code: u16, detail: Option<String>, retry_after: Option<u64>) -> Self {
        match status_code {
            400 | 422 => Error::BadRequest {
                status_code,
                detail,
            },
            404 => Error::NotFound { detail },
            429 => Error::RateLimit {
                detail,
                retry_after,
            },
            500 => Error::InternalServer { detail },
            502..=504 => Error::ServiceUnavailable {
                status_code,
                detail,
                retry_after,
            },
            _ => Error::Api {
                status_code,
                detail,
            },
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new connection error.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new HTTP client error.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns true if this error is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// Returns true if the request never produced an HTTP response.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Timeout { .. } | Error::Connection { .. } | Error::HttpClient { .. }
        )
    }

    /// Returns true if this error is a rate limit.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Error::RateLimit { .. })
    }

    /// Returns true if this error is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns true if this error is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Error::InternalServer { .. } | Error::ServiceUnavailable { .. }
        )
    }

    /// Returns true if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns the HTTP status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. }
            | Error::BadRequest { status_code, .. }
            | Error::ServiceUnavailable { status_code, .. } => Some(*status_code),
            Error::NotFound { .. } => Some(404),
            Error::RateLimit { .. } => Some(429),
            Error::InternalServer { .. } => Some(500),
            _ => None,
        }
    }

    /// Returns the server-provided message, if the backend sent a usable one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Error::Api { detail, .. }
            | Error::BadRequest { detail, .. }
            | Error::NotFound { detail }
            | Error::RateLimit { detail, .. }
            | Error::InternalServer { detail }
            | Error::ServiceUnavailable { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

fn describe(detail: &Option<String>) -> &str {
    detail.as_deref().unwrap_or("no detail provided")
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Api {
                status_code,
                detail,
            } => {
                write!(f, "API error ({status_code}): {}", describe(detail))
            }
            Error::BadRequest { detail, .. } => {
                write!(f, "Bad request: {}", describe(detail))
            }
            Error::NotFound { detail } => {
                write!(f, "Resource not found: {}", describe(detail))
            }
            Error::RateLimit {
                detail,
                retry_after,
            } => {
                if let Some(retry_after) = retry_after {
                    write!(
                        f,
                        "Rate limit exceeded: {} (retry after {retry_after} seconds)",
                        describe(detail)
                    )
                } else {
                    write!(f, "Rate limit exceeded: {}", describe(detail))
                }
            }
            Error::InternalServer { detail } => {
                write!(f, "Internal server error: {}", describe(detail))
            }
            Error::ServiceUnavailable {
                detail,
                retry_after,
                ..
            } => {
                if let Some(retry_after) = retry_after {
                    write!(
                        f,
                        "Service unavailable: {} (retry after {retry_after} seconds)",
                        describe(detail)
                    )
                } else {
                    write!(f, "Service unavailable: {}", describe(detail))
                }
            }
            Error::Timeout { message, duration } => {
                if let Some(duration) = duration {
                    write!(f, "Timeout error: {message} ({duration} seconds)")
                } else {
                    write!(f, "Timeout error: {message}")
                }
            }
            Error::Connection { message, .. } => {
                write!(f, "Connection error: {message}")
            }
            Error::HttpClient { message, .. } => {
                write!(f, "HTTP client error: {message}")
            }
            Error::Serialization { message, .. } => {
                write!(f, "Serialization error: {message}")
            }
            Error::Io { message, .. } => {
                write!(f, "I/O error: {message}")
            }
            Error::Validation { message, param } => {
                if let Some(param) = param {
                    write!(f, "Validation error: {message} (parameter: {param})")
                } else {
                    write!(f, "Validation error: {message}")
                }
            }
            Error::Url { message, .. } => {
                write!(f, "URL error: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. }
            | Error::HttpClient { source, .. }
            | Error::Serialization { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::serialization(format!("YAML error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

/// A specialized Result type for book assistant operations.
pub type Result<T> = std::result::Result<T, Error>;
