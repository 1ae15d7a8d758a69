//! Interactive terminal chat with the AI book assistant.
//!
//! # Usage
//!
//! ```bash
//! # Talk to the production backend
//! book-assistant-chat
//!
//! # Pretend the book is served locally (uses http://localhost:8001)
//! book-assistant-chat --host localhost
//!
//! # Point at a specific backend
//! book-assistant-chat --backend-url https://staging.example.com
//! ```
//!
//! Set `RUST_LOG=book_assistant=debug` for request diagnostics.
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/select <text>` - Scope the next question to a passage
//! - `/unselect` - Clear the selected passage
//! - `/sources on|off` - Expand or collapse citations
//! - `/session` - Show the session id
//! - `/quit` - Exit the application

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use book_assistant::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, ChatView, PlainTextRenderer, Renderer,
    SelectionChange, help_text, parse_command,
};
use book_assistant::utils::time::init_local_offset;
use book_assistant::{BookAssistant, SelectionBus};

/// Main entry point for the book-assistant-chat application.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    // Must run while the process is still single-threaded.
    init_local_offset();

    let (args, _) = ChatArgs::from_command_line_relaxed("book-assistant-chat [OPTIONS]");
    let config = ChatConfig::from_args(args)?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config))
}

async fn run(config: ChatConfig) -> Result<(), Box<dyn std::error::Error>> {
    let base_url = config.base_url();
    tracing::debug!(%base_url, "resolved backend");

    let client = BookAssistant::with_options(&base_url, config.timeout)?;
    let bus = SelectionBus::new();
    let mut session = ChatSession::mount(client, &bus);
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    renderer.set_expand_sources(config.expand_sources);
    let mut view = ChatView::new();
    let mut rl = DefaultEditor::new()?;

    println!("AI Book Assistant ({base_url})");
    println!("Type /help for commands, /quit to exit\n");
    view.refresh(session.messages(), &mut renderer);

    loop {
        session.poll_initialize();
        let prompt = if session.selection().is_some() {
            "Ask about the selected text: "
        } else {
            "Ask a question about the book: "
        };

        match rl.readline(prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                if let Some(cmd) = parse_command(&line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Select(text) => {
                            bus.release(text.as_str());
                            match session.sync_selection().await {
                                Some(SelectionChange::Captured) => {
                                    renderer.print_selection(session.selection())
                                }
                                Some(SelectionChange::Unchanged) => {
                                    renderer.print_info("Selection unchanged.")
                                }
                                Some(SelectionChange::Ignored) => renderer.print_info(
                                    "Selection ignored: it must be longer than 10 characters.",
                                ),
                                None => {}
                            }
                        }
                        ChatCommand::Unselect => {
                            session.clear_selection();
                            renderer.print_selection(None);
                        }
                        ChatCommand::Sources(expand) => {
                            renderer.set_expand_sources(expand);
                            if expand {
                                renderer.print_info("Source excerpts expanded.");
                            } else {
                                renderer.print_info("Source excerpts collapsed.");
                            }
                        }
                        ChatCommand::Session => print_session(&session, &mut renderer).await,
                        ChatCommand::Status => match session.backend().status().await {
                            Ok(status) => renderer.print_info(&format!(
                                "{} (version {})",
                                status.message,
                                status.version.as_deref().unwrap_or("unknown")
                            )),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::Stats => print_stats(&session),
                        ChatCommand::SaveTranscript(path) => {
                            match session.save_transcript_to(&path) {
                                Ok(_) => {
                                    renderer.print_info(&format!("Transcript saved to {}", path))
                                }
                                Err(err) => renderer
                                    .print_error(&format!("Failed to save transcript: {}", err)),
                            }
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                session.set_input(line);
                let Some(pending) = session.begin_submit() else {
                    continue;
                };
                view.refresh(session.messages(), &mut renderer);
                renderer.start_typing();
                let result = session.backend().query(pending.request()).await;
                session.complete(pending, result);
                view.refresh(session.messages(), &mut renderer);
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

async fn print_session(session: &ChatSession<BookAssistant>, renderer: &mut dyn Renderer) {
    let Some(id) = session.session_id() else {
        println!("    Session: (still being created)");
        return;
    };
    println!("    Session: {}", id);
    if id.is_fallback() {
        println!("      Origin: generated locally (backend unavailable at startup)");
        return;
    }
    println!("      Origin: backend");
    match session.backend().session_info(id.as_str()).await {
        Ok(info) => {
            println!(
                "      Active: {}",
                info.active
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            );
            if let Some(created) = info.created_at.as_deref() {
                println!("      Created: {}", created);
            }
            if let Some(last) = info.last_activity.as_deref() {
                println!("      Last activity: {}", last);
            }
            println!("      Recorded queries: {}", info.query_history.len());
        }
        Err(err) => renderer.print_error(&format!("Failed to fetch session: {}", err)),
    }
}

fn print_stats(session: &ChatSession<BookAssistant>) {
    let stats = session.stats();
    println!("    Session Statistics:");
    match stats.session_id {
        Some(ref id) if id.is_fallback() => println!("      Session: {} (fallback)", id),
        Some(ref id) => println!("      Session: {}", id),
        None => println!("      Session: (still being created)"),
    }
    println!(
        "      Messages: {} ({} from you, {} from the assistant)",
        stats.message_count, stats.user_messages, stats.bot_messages
    );
    println!("      Failed turns: {}", stats.failed_turns);
    println!("      Sources received: {}", stats.sources_received);
    println!(
        "      Selection: {}",
        if stats.selection_active {
            "active"
        } else {
            "none"
        }
    );
}
