//! Chat application module for conversations with the book assistant.
//!
//! This module provides the state of one chat widget and a terminal surface
//! for it. It supports:
//!
//! - Session initialization with a local fallback identifier
//! - Questions scoped to a selected passage
//! - Collapsible source citations
//! - Slash commands for session control
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Conversation state and the submit flow
//! - [`commands`]: Slash command parsing
//! - [`render`]: Terminal output

mod commands;
mod config;
mod render;
mod session;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, ChatFileConfig};
pub use render::{
    ChatView, PlainTextRenderer, Renderer, SELECTION_PREVIEW_CHARS, SOURCE_EXCERPT_CHARS,
    WELCOME_TEXT, preview,
};
pub use session::{
    ChatSession, FALLBACK_REPLY, PendingQuery, SelectionChange, SessionStats, SubmitOutcome,
    failure_reply,
};
