//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction for the
//! conversation.  The default implementation writes plain text with
//! optional ANSI styling to stdout, or to any other writer for tests.

use std::io::{self, Stdout, Write};

use crate::types::{Message, Sender, SourceChunk};
use crate::utils::time::clock;

/// ANSI escape code for dim text (timestamps, typing indicator).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (user messages).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (bot messages).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for yellow text (selection preview).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for red text (errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code for magenta text (source titles).
const ANSI_MAGENTA: &str = "\x1b[35m";

/// ANSI sequence that returns to column zero and erases the line.
const ANSI_CLEAR_LINE: &str = "\r\x1b[2K";

/// Characters of a source excerpt shown when sources are expanded.
pub const SOURCE_EXCERPT_CHARS: usize = 100;

/// Characters of the active selection shown in its preview.
pub const SELECTION_PREVIEW_CHARS: usize = 60;

/// Shown instead of an empty conversation.
pub const WELCOME_TEXT: &str = "AI Book Assistant is ready to help! Ask me questions about this \
book's content or select text to ask specific questions about it.";

/// Truncates `text` to `max_chars` characters, appending `...` if anything was cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Trait for rendering chat output.
pub trait Renderer {
    /// Print the static welcome shown while the conversation is empty.
    fn print_welcome(&mut self);

    /// Print one message, including its citations.
    fn print_message(&mut self, message: &Message);

    /// Show the typing indicator while a query is in flight.
    fn start_typing(&mut self);

    /// Remove the typing indicator.
    fn finish_typing(&mut self);

    /// Print the preview of the active selection, or note that it was cleared.
    fn print_selection(&mut self, selection: Option<&str>);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer<W: Write = Stdout> {
    out: W,
    use_color: bool,
    expand_sources: bool,
    typing: bool,
}

impl PlainTextRenderer<Stdout> {
    /// Creates a new PlainTextRenderer on stdout with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer on stdout with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl Default for PlainTextRenderer<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> PlainTextRenderer<W> {
    /// Creates a renderer on an arbitrary writer.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self {
            out,
            use_color,
            expand_sources: false,
            typing: false,
        }
    }

    /// Shows or hides source excerpts; collapsed sources only show a count.
    pub fn set_expand_sources(&mut self, expand: bool) {
        self.expand_sources = expand;
    }

    /// Whether source excerpts are shown.
    pub fn expand_sources(&self) -> bool {
        self.expand_sources
    }

    /// Consumes the renderer, returning its writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_color {
            format!("{color}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    fn print_sources(&mut self, sources: &[SourceChunk]) -> io::Result<()> {
        if self.expand_sources {
            writeln!(self.out, "    [-] Sources ({})", sources.len())?;
            for source in sources {
                let title = self.paint(ANSI_MAGENTA, &format!("{}:", source.title));
                let excerpt = preview(&source.text, SOURCE_EXCERPT_CHARS);
                writeln!(self.out, "        {title} {excerpt}")?;
            }
        } else {
            writeln!(
                self.out,
                "    [+] Sources ({}) - /sources on to expand",
                sources.len()
            )?;
        }
        Ok(())
    }

    fn write_message(&mut self, message: &Message) -> io::Result<()> {
        let (label, color) = match message.sender {
            Sender::User => ("You", ANSI_CYAN),
            Sender::Bot => ("Assistant", ANSI_GREEN),
        };
        let label = self.paint(color, &format!("{label}:"));
        let stamp = self.paint(ANSI_DIM, &format!("[{}]", clock(&message.timestamp)));
        writeln!(self.out, "{stamp} {label} {}", message.text)?;
        if message.has_sources() {
            self.print_sources(&message.sources)?;
        }
        Ok(())
    }

    fn flush(&mut self) {
        let _ = self.out.flush();
    }
}

impl<W: Write> Renderer for PlainTextRenderer<W> {
    fn print_welcome(&mut self) {
        let _ = writeln!(self.out, "{WELCOME_TEXT}");
        self.flush();
    }

    fn print_message(&mut self, message: &Message) {
        self.finish_typing();
        let _ = self.write_message(message);
        self.flush();
    }

    fn start_typing(&mut self) {
        if self.typing {
            return;
        }
        self.typing = true;
        let indicator = self.paint(ANSI_DIM, "Assistant is typing...");
        let _ = write!(self.out, "{indicator}");
        if !self.use_color {
            let _ = writeln!(self.out);
        }
        self.flush();
    }

    fn finish_typing(&mut self) {
        if !self.typing {
            return;
        }
        self.typing = false;
        if self.use_color {
            let _ = write!(self.out, "{ANSI_CLEAR_LINE}");
        }
        self.flush();
    }

    fn print_selection(&mut self, selection: Option<&str>) {
        match selection {
            Some(text) => {
                let label = self.paint(ANSI_YELLOW, "Selected:");
                let _ = writeln!(
                    self.out,
                    "{label} {}",
                    preview(text, SELECTION_PREVIEW_CHARS)
                );
            }
            None => {
                let _ = writeln!(self.out, "Selection cleared.");
            }
        }
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.finish_typing();
        let line = self.paint(ANSI_RED, &format!("Error: {error}"));
        eprintln!("{line}");
    }

    fn print_info(&mut self, info: &str) {
        self.finish_typing();
        let _ = writeln!(self.out, "{info}");
        self.flush();
    }
}

/// Tracks which messages have been shown so only new ones are printed.
///
/// After every refresh the newest message is the last thing on screen.
#[derive(Debug, Default)]
pub struct ChatView {
    rendered: usize,
    welcomed: bool,
}

impl ChatView {
    /// Creates a view that has shown nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prints messages appended since the last refresh.
    ///
    /// An empty conversation shows the welcome text once.  Returns the
    /// number of messages printed.
    pub fn refresh(&mut self, messages: &[Message], renderer: &mut dyn Renderer) -> usize {
        if messages.is_empty() {
            if !self.welcomed {
                renderer.print_welcome();
                self.welcomed = true;
            }
            self.rendered = 0;
            return 0;
        }
        let start = self.rendered.min(messages.len());
        for message in &messages[start..] {
            renderer.print_message(message);
        }
        self.rendered = messages.len();
        messages.len() - start
    }

    /// Number of messages already shown.
    pub fn rendered(&self) -> usize {
        self.rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(messages: &[Message], expand: bool) -> String {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        renderer.set_expand_sources(expand);
        let mut view = ChatView::new();
        view.refresh(messages, &mut renderer);
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
        assert!(!renderer.expand_sources());
    }

    #[test]
    fn preview_truncates_by_characters() {
        assert_eq!(preview("short", 60), "short");
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("ééééé", 2), "éé...");
        assert_eq!(preview(&"x".repeat(60), 60), "x".repeat(60));
    }

    #[test]
    fn empty_conversation_shows_welcome_once() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        let mut view = ChatView::new();
        assert_eq!(view.refresh(&[], &mut renderer), 0);
        assert_eq!(view.refresh(&[], &mut renderer), 0);
        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out.matches(WELCOME_TEXT).count(), 1);
    }

    #[test]
    fn refresh_prints_only_new_messages() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        let mut view = ChatView::new();
        let mut messages = vec![Message::user(1, "first")];
        assert_eq!(view.refresh(&messages, &mut renderer), 1);
        messages.push(Message::bot(2, "second", Vec::new()));
        assert_eq!(view.refresh(&messages, &mut renderer), 1);
        assert_eq!(view.rendered(), 2);

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out.matches("first").count(), 1);
        let first = out.find("You: first").unwrap();
        let second = out.find("Assistant: second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn no_sources_region_without_sources() {
        let out = render(&[Message::bot(1, "Chapter 2 covers architecture.", Vec::new())], true);
        assert!(out.contains("Assistant: Chapter 2 covers architecture."));
        assert!(!out.contains("Sources"));
    }

    #[test]
    fn collapsed_sources_show_count() {
        let sources = vec![
            SourceChunk::new("Chapter 1", "one"),
            SourceChunk::new("Chapter 2", "two"),
            SourceChunk::new("Chapter 3", "three"),
        ];
        let out = render(&[Message::bot(1, "answer", sources)], false);
        assert!(out.contains("[+] Sources (3)"));
        assert!(!out.contains("Chapter 1:"));
    }

    #[test]
    fn expanded_sources_truncate_excerpts() {
        let long = "y".repeat(250);
        let sources = vec![
            SourceChunk::new("Chapter 1", long.clone()),
            SourceChunk::new("Chapter 2", "brief"),
        ];
        let out = render(&[Message::bot(1, "answer", sources)], true);
        assert!(out.contains("[-] Sources (2)"));
        assert!(out.contains(&format!("Chapter 1: {}...", "y".repeat(SOURCE_EXCERPT_CHARS))));
        assert!(!out.contains(&"y".repeat(SOURCE_EXCERPT_CHARS + 1)));
        assert!(out.contains("Chapter 2: brief\n"));
    }

    #[test]
    fn typing_indicator_is_transient() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        renderer.start_typing();
        renderer.start_typing();
        renderer.print_message(&Message::bot(1, "done", Vec::new()));
        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out.matches("Assistant is typing...").count(), 1);
        assert!(out.ends_with("Assistant: done\n"));
    }

    #[test]
    fn selection_preview() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        renderer.print_selection(Some(&"s".repeat(80)));
        renderer.print_selection(None);
        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(out.contains(&format!("Selected: {}...", "s".repeat(SELECTION_PREVIEW_CHARS))));
        assert!(out.contains("Selection cleared."));
    }
}
