//! Session client for the AI book assistant.
//!
//! [`BookAssistant`] speaks the backend's HTTP API; [`chat::ChatSession`]
//! holds the state of one chat widget on top of it.

// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod observability;
pub mod selection;
pub mod types;
pub mod utils;

// Re-exports
pub use client::{BookAssistant, ChatBackend};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use selection::{SelectionBus, SelectionListener};
pub use types::*;
