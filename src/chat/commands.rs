//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the backend.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Simulate the user selecting text in the page.
    Select(String),

    /// Clear the active selection.
    Unselect,

    /// Expand or collapse source citations.
    Sources(bool),

    /// Show the session identifier and what the backend knows about it.
    Session,

    /// Show the backend banner.
    Status,

    /// Display session statistics.
    Stats,

    /// Save the transcript to a specific file immediately.
    SaveTranscript(String),

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command,
/// or `None` if it should be treated as a question.
///
/// # Examples
///
/// ```
/// # use book_assistant::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/select the passage about lifetimes").is_some());
/// assert!(parse_command("What is chapter 2 about?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "select" => match argument {
            Some(text) => ChatCommand::Select(text.to_string()),
            None => ChatCommand::Invalid("/select requires some text".to_string()),
        },
        "unselect" | "clear-selection" => ChatCommand::Unselect,
        "sources" => match argument.and_then(parse_on_off) {
            Some(value) => ChatCommand::Sources(value),
            None => ChatCommand::Invalid("/sources expects 'on' or 'off'".to_string()),
        },
        "session" => ChatCommand::Session,
        "status" => ChatCommand::Status,
        "stats" => ChatCommand::Stats,
        "save" => match argument {
            Some(arg) => ChatCommand::SaveTranscript(arg.to_string()),
            None => ChatCommand::Invalid("/save requires a file path".to_string()),
        },
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /select <text>         Select a passage to ask about (longer than 10 characters)
  /unselect              Clear the selected passage
  /sources on|off        Expand or collapse source citations
  /session               Show the session id and its backend record
  /status                Show the backend banner
  /stats                 Show session statistics
  /save <file>           Save the current transcript as JSON
  /help                  Show this help message
  /quit                  Exit the chat"#
}
