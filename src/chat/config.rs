//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg`, an optional YAML
//! configuration file, and the resolved [`ChatConfig`].

use std::path::Path;
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::client::{BACKEND_URL_ENV, resolve_base_url};
use crate::error::{Error, Result};

/// Command-line arguments for the book-assistant-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Backend base URL.
    #[arrrg(optional, "Backend base URL (overrides BOOK_ASSISTANT_BACKEND_URL)", "URL")]
    pub backend_url: Option<String>,

    /// Host the book is served from.
    #[arrrg(optional, "Host the book is served from; loopback selects the local backend", "HOST")]
    pub host: Option<String>,

    /// Client-side request timeout.
    #[arrrg(optional, "Request timeout in seconds (default: none)", "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// YAML configuration file.
    #[arrrg(optional, "YAML configuration file", "FILE")]
    pub config: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Show source excerpts instead of just their count.
    #[arrrg(flag, "Expand source citations by default")]
    pub expand_sources: bool,
}

/// Settings read from a YAML configuration file.
///
/// Every field is optional; command-line arguments take precedence.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatFileConfig {
    /// Backend base URL.
    #[serde(default)]
    pub backend_url: Option<String>,
    /// Host the book is served from.
    #[serde(default)]
    pub host: Option<String>,
    /// Request timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Whether to use ANSI colors.
    #[serde(default)]
    pub color: Option<bool>,
    /// Whether to expand source citations.
    #[serde(default)]
    pub expand_sources: Option<bool>,
}

impl ChatFileConfig {
    /// Parses a configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Loads a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            Error::io(format!("failed to read config {}", path.display()), err)
        })?;
        Self::from_yaml(&content)
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments and the configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Explicit backend URL; `None` defers to the environment and host.
    pub backend_url: Option<String>,

    /// Host the book is served from, used to pick the default backend.
    pub served_from: Option<String>,

    /// Client-side request timeout; `None` leaves it to the network stack.
    pub timeout: Option<Duration>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether source citations start expanded.
    pub expand_sources: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Backend: resolved from the environment, else production
    /// - Timeout: none
    /// - Color: enabled
    /// - Sources: collapsed
    pub fn new() -> Self {
        Self {
            backend_url: None,
            served_from: None,
            timeout: None,
            use_color: true,
            expand_sources: false,
        }
    }

    /// Sets the backend URL.
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }

    /// Sets the host the book is served from.
    pub fn with_served_from(mut self, host: impl Into<String>) -> Self {
        self.served_from = Some(host.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets whether source citations start expanded.
    pub fn with_expand_sources(mut self, expand: bool) -> Self {
        self.expand_sources = expand;
        self
    }

    /// Resolves configuration from arguments, loading `--config` if given.
    pub fn from_args(args: ChatArgs) -> Result<Self> {
        let file = match args.config.as_deref() {
            Some(path) => ChatFileConfig::from_file(path)?,
            None => ChatFileConfig::default(),
        };
        Ok(Self::merge(args, file))
    }

    /// Combines arguments with a file configuration; arguments win.
    pub fn merge(args: ChatArgs, file: ChatFileConfig) -> Self {
        let timeout_secs = args.timeout_secs.or(file.timeout_secs);
        ChatConfig {
            backend_url: args.backend_url.or(file.backend_url),
            served_from: args.host.or(file.host),
            timeout: timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            use_color: !args.no_color && file.color.unwrap_or(true),
            expand_sources: args.expand_sources || file.expand_sources.unwrap_or(false),
        }
    }

    /// The backend URL, given the value of the override environment variable.
    pub fn base_url_with_env(&self, from_env: Option<&str>) -> String {
        let explicit = self.backend_url.as_deref().or(from_env);
        resolve_base_url(explicit, self.served_from.as_deref())
    }

    /// The backend URL, consulting [`BACKEND_URL_ENV`].
    pub fn base_url(&self) -> String {
        let from_env = std::env::var(BACKEND_URL_ENV).ok();
        self.base_url_with_env(from_env.as_deref())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}
