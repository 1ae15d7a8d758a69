//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the conversation
//! state of one mounted chat widget: its session identifier, the append-only
//! message list, the active selection, and the loading flag that keeps
//! submissions from overlapping.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde_json::to_writer_pretty;
use time::OffsetDateTime;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::Error;
use crate::client::ChatBackend;
use crate::error::Result;
use crate::observability::{
    QUERIES_IGNORED, QUERIES_SUBMITTED, QUERY_FAILURES, QUERY_SOURCES, SELECTIONS_CAPTURED,
    SELECTIONS_IGNORED, SESSION_FALLBACKS, SESSIONS_CREATED,
};
use crate::selection::{SelectionBus, SelectionListener, meaningful_selection};
use crate::types::{
    Message, QueryRequest, QueryResponse, Sender, SessionCreated, SessionId, SourceChunk,
};

/// Bot reply used when a failure carries no usable message.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// What became of one call to [`ChatSession::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Nothing was sent: the input was blank or a request was in flight.
    Ignored,
    /// The backend answered; the bot message carries its reply.
    Answered,
    /// The request failed; the bot message carries the explanation.
    Failed,
}

/// What a pointer release did to the active selection.
///
/// Ordered by significance, so the strongest effect of several releases is
/// their maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SelectionChange {
    /// The text was too short and was dropped.
    Ignored,
    /// The text matched the active selection.
    Unchanged,
    /// The text became the active selection.
    Captured,
}

/// Clears the loading flag when dropped, whichever way the request ends.
#[derive(Debug)]
struct LoadingGuard {
    flag: Arc<AtomicBool>,
}

impl LoadingGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// A query that has been recorded in the transcript and is awaiting its answer.
///
/// The session stays in the loading state for as long as this value lives.
#[derive(Debug)]
pub struct PendingQuery {
    request: QueryRequest,
    _loading: LoadingGuard,
}

impl PendingQuery {
    /// The request to send to the backend.
    pub fn request(&self) -> &QueryRequest {
        &self.request
    }
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The session identifier, if initialization has run.
    pub session_id: Option<SessionId>,
    /// The number of messages in the conversation.
    pub message_count: usize,
    /// Messages the user sent.
    pub user_messages: usize,
    /// Messages the bot sent, including failure replies.
    pub bot_messages: usize,
    /// Turns that ended in a failure reply.
    pub failed_turns: u64,
    /// Citations received across all answers.
    pub sources_received: usize,
    /// Whether a selection is waiting to scope the next query.
    pub selection_active: bool,
    /// Whether a request is in flight.
    pub loading: bool,
}

/// The conversation state of one chat widget.
pub struct ChatSession<B: ChatBackend> {
    backend: Arc<B>,
    session_id: Option<SessionId>,
    pending_init: Option<oneshot::Receiver<Result<SessionCreated>>>,
    messages: Vec<Message>,
    input: String,
    selection: Option<String>,
    listener: Option<SelectionListener>,
    loading: Arc<AtomicBool>,
    next_message_id: u64,
    failed_turns: u64,
}

impl<B: ChatBackend> ChatSession<B> {
    /// Creates an unmounted session: no identifier yet and no selection listener.
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            session_id: None,
            pending_init: None,
            messages: Vec::new(),
            input: String::new(),
            selection: None,
            listener: None,
            loading: Arc::new(AtomicBool::new(false)),
            next_message_id: 1,
            failed_turns: 0,
        }
    }

    /// Creates a session, attaches it to the page's selection bus, and
    /// starts creating its identifier in the background.
    ///
    /// Returns without waiting for the backend.  The outcome is applied by
    /// [`poll_initialize`](Self::poll_initialize), which every submission and
    /// selection sync runs first, or by
    /// [`wait_initialized`](Self::wait_initialized).  Must be called from
    /// within a Tokio runtime.
    pub fn mount(backend: B, bus: &SelectionBus) -> Self
    where
        B: 'static,
    {
        let mut session = Self::new(backend);
        session.attach_selection(bus);
        session.spawn_initialize();
        session
    }

    fn spawn_initialize(&mut self)
    where
        B: 'static,
    {
        let backend = Arc::clone(&self.backend);
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            // The session may have been dropped; nobody is left to tell.
            let _ = tx.send(backend.create_session().await);
        });
        self.pending_init = Some(rx);
    }

    /// Obtains a session identifier from the backend and waits for it,
    /// falling back to a locally generated one if the backend cannot
    /// provide it.
    pub async fn initialize(&mut self) -> &SessionId {
        self.pending_init = None;
        let result = self.backend.create_session().await;
        self.apply_initialize(result)
    }

    /// Applies background session creation if it has finished.
    ///
    /// Returns true while it is still outstanding.
    pub fn poll_initialize(&mut self) -> bool {
        let Some(rx) = self.pending_init.as_mut() else {
            return false;
        };
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return true,
            Err(TryRecvError::Closed) => Err(init_task_lost()),
        };
        self.pending_init = None;
        self.apply_initialize(result);
        false
    }

    /// Waits for background session creation, if any is outstanding, and
    /// returns the identifier.
    pub async fn wait_initialized(&mut self) -> Option<&SessionId> {
        if let Some(rx) = self.pending_init.take() {
            let result = rx.await.unwrap_or_else(|_| Err(init_task_lost()));
            self.apply_initialize(result);
        }
        self.session_id.as_ref()
    }

    fn apply_initialize(&mut self, result: Result<SessionCreated>) -> &SessionId {
        match result {
            Ok(created) => {
                SESSIONS_CREATED.click();
                if let Some(previous) = self.session_id.as_ref() {
                    tracing::debug!(%previous, "replacing session id with the backend's");
                }
                self.session_id.insert(SessionId::Remote(created.session_id))
            }
            Err(err) => {
                let id = self.session_id.get_or_insert_with(|| {
                    SESSION_FALLBACKS.click();
                    SessionId::fallback()
                });
                tracing::warn!(
                    session_id = %id,
                    "failed to initialize session, using fallback: {err}"
                );
                id
            }
        }
    }

    /// Subscribes to pointer releases on `bus`, replacing any prior subscription.
    pub fn attach_selection(&mut self, bus: &SelectionBus) {
        self.listener = Some(bus.subscribe());
    }

    /// Releases the selection subscription.
    pub fn detach_selection(&mut self) {
        self.listener = None;
    }

    /// Returns true while the session listens for selections.
    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    /// Processes pointer releases published since the last call.
    ///
    /// Returns the strongest change they made, or `None` if there were none.
    pub async fn sync_selection(&mut self) -> Option<SelectionChange> {
        self.poll_initialize();
        let listener = self.listener.as_mut()?;
        let events = listener.settle().await;
        events
            .into_iter()
            .map(|event| self.capture_selection(&event.selection))
            .max()
    }

    /// Stores `raw` as the active selection if it is meaningful.
    ///
    /// Short selections are ignored and leave the current one in place.
    pub fn capture_selection(&mut self, raw: &str) -> SelectionChange {
        let Some(text) = meaningful_selection(raw) else {
            SELECTIONS_IGNORED.click();
            return SelectionChange::Ignored;
        };
        if self.selection.as_deref() == Some(text) {
            return SelectionChange::Unchanged;
        }
        SELECTIONS_CAPTURED.click();
        self.selection = Some(text.to_string());
        SelectionChange::Captured
    }

    /// Drops the active selection.
    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// The selection that will scope the next query.
    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    /// Replaces the pending input text.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// The pending input text.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// True while a query is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// The session identifier, once initialization has run.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// The conversation, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// The backend this session talks to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Records the pending input as a user message and enters the loading state.
    ///
    /// Returns `None` without touching any state when the input is blank or
    /// another query is in flight.
    pub fn begin_submit(&mut self) -> Option<PendingQuery> {
        if self.input.trim().is_empty() {
            QUERIES_IGNORED.click();
            return None;
        }
        let Some(loading) = LoadingGuard::acquire(&self.loading) else {
            QUERIES_IGNORED.click();
            return None;
        };
        QUERIES_SUBMITTED.click();
        self.poll_initialize();

        let text = std::mem::take(&mut self.input);
        self.push(Sender::User, text.clone(), Vec::new());

        let session_id = self
            .session_id
            .get_or_insert_with(|| {
                SESSION_FALLBACKS.click();
                SessionId::fallback()
            })
            .as_str()
            .to_string();
        let request = QueryRequest::new(text, self.selection.clone(), session_id);
        Some(PendingQuery {
            request,
            _loading: loading,
        })
    }

    /// Records the outcome of a pending query and leaves the loading state.
    pub fn complete(
        &mut self,
        pending: PendingQuery,
        result: Result<QueryResponse>,
    ) -> SubmitOutcome {
        let PendingQuery { request, _loading } = pending;
        match result {
            Ok(response) => {
                QUERY_SOURCES.add(response.source_chunks.len() as f64);
                self.push(Sender::Bot, response.response_text, response.source_chunks);
                // A newer selection captured while waiting is kept.
                if request.selected_text.is_some() && self.selection == request.selected_text {
                    self.selection = None;
                }
                SubmitOutcome::Answered
            }
            Err(err) => {
                QUERY_FAILURES.click();
                tracing::warn!(
                    session_id = %request.session_id,
                    "error sending message: {err}"
                );
                self.failed_turns += 1;
                self.push(Sender::Bot, failure_reply(&err), Vec::new());
                SubmitOutcome::Failed
            }
        }
    }

    /// Submits the pending input and waits for the round trip to settle.
    pub async fn submit_input(&mut self) -> SubmitOutcome {
        let Some(pending) = self.begin_submit() else {
            return SubmitOutcome::Ignored;
        };
        let result = self.backend.query(pending.request()).await;
        self.complete(pending, result)
    }

    /// Sets the input to `text` and submits it.
    pub async fn submit(&mut self, text: &str) -> SubmitOutcome {
        if self.is_loading() {
            QUERIES_IGNORED.click();
            return SubmitOutcome::Ignored;
        }
        self.set_input(text);
        self.submit_input().await
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        let user_messages = self
            .messages
            .iter()
            .filter(|m| m.sender == Sender::User)
            .count();
        SessionStats {
            session_id: self.session_id.clone(),
            message_count: self.messages.len(),
            user_messages,
            bot_messages: self.messages.len() - user_messages,
            failed_turns: self.failed_turns,
            sources_received: self.messages.iter().map(|m| m.sources.len()).sum(),
            selection_active: self.selection.is_some(),
            loading: self.is_loading(),
        }
    }

    /// Saves the transcript to the specified path.
    pub fn save_transcript_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let transcript = TranscriptFile {
            version: 1,
            session_id: self.session_id.as_ref(),
            saved_at: crate::utils::time::now(),
            messages: &self.messages,
        };
        let file = File::create(path.as_ref())
            .map_err(|err| Error::io("failed to create transcript file", err))?;
        let writer = BufWriter::new(file);
        to_writer_pretty(writer, &transcript).map_err(|err| {
            Error::serialization("failed to serialize transcript", Some(Box::new(err)))
        })
    }

    fn push(&mut self, sender: Sender, text: String, sources: Vec<SourceChunk>) {
        let id = self.next_message_id;
        self.next_message_id += 1;
        let message = match sender {
            Sender::User => Message::user(id, text),
            Sender::Bot => Message::bot(id, text, sources),
        };
        self.messages.push(message);
    }
}

fn init_task_lost() -> Error {
    Error::connection("session creation ended without a result", None)
}

/// The bot reply for a failed query.
///
/// Server-provided detail is shown verbatim; anything else, including every
/// transport failure, gets [`FALLBACK_REPLY`].
pub fn failure_reply(err: &Error) -> String {
    err.detail().unwrap_or(FALLBACK_REPLY).to_string()
}

#[derive(Serialize)]
struct TranscriptFile<'a> {
    version: u8,
    session_id: Option<&'a SessionId>,
    #[serde(with = "crate::utils::time")]
    saved_at: OffsetDateTime,
    messages: &'a [Message],
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Backend that replays canned results and records every request.
    struct ScriptedBackend {
        session: Result<SessionCreated>,
        session_gate: Option<Arc<Notify>>,
        replies: Mutex<Vec<Result<QueryResponse>>>,
        seen: Mutex<Vec<QueryRequest>>,
    }

    impl ScriptedBackend {
        fn new(session: Result<SessionCreated>) -> Self {
            Self {
                session,
                session_gate: None,
                replies: Mutex::new(Vec::new()),
                seen: Mutex::new(Vec::new()),
            }
        }

        /// Holds `create_session` until `gate` is notified.
        fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.session_gate = Some(gate);
            self
        }

        fn remote(id: &str) -> Self {
            Self::new(Ok(SessionCreated {
                session_id: id.to_string(),
                created_at: None,
                active: Some(true),
            }))
        }

        fn reply(self, result: Result<QueryResponse>) -> Self {
            self.replies.lock().unwrap().insert(0, result);
            self
        }

        fn seen(&self) -> Vec<QueryRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn create_session(&self) -> Result<SessionCreated> {
            if let Some(gate) = &self.session_gate {
                gate.notified().await;
            }
            self.session.clone()
        }

        async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
            self.seen.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(Error::connection("no scripted reply", None)))
        }
    }

    #[tokio::test]
    async fn initialize_uses_backend_id() {
        let mut session = ChatSession::new(ScriptedBackend::remote("abc123"));
        assert!(session.session_id().is_none());
        let id = session.initialize().await;
        assert_eq!(id, &SessionId::Remote("abc123".to_string()));
    }

    #[tokio::test]
    async fn initialize_falls_back_on_failure() {
        let backend = ScriptedBackend::new(Err(Error::connection("refused", None)))
            .reply(Ok(QueryResponse::new("still works")));
        let mut session = ChatSession::new(backend);
        let id = session.initialize().await.clone();
        assert!(id.is_fallback());
        assert!(id.as_str().starts_with("session_"));

        assert_eq!(session.submit("Hello there").await, SubmitOutcome::Answered);
        assert_eq!(session.backend().seen()[0].session_id, id.as_str());
    }

    #[tokio::test]
    async fn global_query_example() {
        let backend = ScriptedBackend::remote("abc123").reply(Ok(QueryResponse::new(
            "Chapter 2 covers architecture.",
        )));
        let mut session = ChatSession::new(backend);
        session.initialize().await;

        let outcome = session.submit("What is chapter 2 about?").await;
        assert_eq!(outcome, SubmitOutcome::Answered);
        assert_eq!(
            session.backend().seen(),
            vec![QueryRequest::new("What is chapter 2 about?", None, "abc123")]
        );

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].text, "What is chapter 2 about?");
        assert_eq!(messages[1].sender, Sender::Bot);
        assert_eq!(messages[1].text, "Chapter 2 covers architecture.");
        assert!(!messages[1].has_sources());
        assert!(!session.is_loading());
        assert_eq!(session.input(), "");
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let mut session = ChatSession::new(ScriptedBackend::remote("s"));
        session.initialize().await;
        assert_eq!(session.submit("").await, SubmitOutcome::Ignored);
        assert_eq!(session.submit("   \n\t").await, SubmitOutcome::Ignored);
        assert_eq!(session.message_count(), 0);
        assert!(session.backend().seen().is_empty());
    }

    #[tokio::test]
    async fn submission_while_loading_is_ignored() {
        let mut session = ChatSession::new(ScriptedBackend::remote("s"));
        session.initialize().await;

        session.set_input("first question");
        let pending = session.begin_submit().expect("first submission starts");
        assert!(session.is_loading());

        session.set_input("second question");
        assert!(session.begin_submit().is_none());
        assert_eq!(session.submit("third question").await, SubmitOutcome::Ignored);
        assert_eq!(session.message_count(), 1);
        assert_eq!(session.input(), "second question");

        session.complete(pending, Ok(QueryResponse::new("answer")));
        assert!(!session.is_loading());
        assert_eq!(session.message_count(), 2);
    }

    #[tokio::test]
    async fn dropped_request_leaves_loading_state() {
        let mut session = ChatSession::new(ScriptedBackend::remote("s"));
        session.set_input("question");
        let pending = session.begin_submit().unwrap();
        assert!(session.is_loading());
        drop(pending);
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn selection_scopes_one_query() {
        let backend = ScriptedBackend::remote("s")
            .reply(Ok(QueryResponse::new("about the selection")))
            .reply(Ok(QueryResponse::new("about the book")));
        let bus = SelectionBus::new();
        let mut session = ChatSession::mount(backend, &bus);
        session.wait_initialized().await;

        assert_eq!(session.sync_selection().await, None);
        bus.release("short");
        assert_eq!(session.sync_selection().await, Some(SelectionChange::Ignored));
        assert_eq!(session.selection(), None);

        bus.release("  the borrow checker rejects this  ");
        assert_eq!(session.sync_selection().await, Some(SelectionChange::Captured));
        assert_eq!(session.selection(), Some("the borrow checker rejects this"));

        session.submit("Why?").await;
        assert_eq!(session.selection(), None);
        session.submit("And the book?").await;

        let seen = session.backend().seen();
        assert_eq!(seen[0].query_type, crate::types::QueryType::SelectionQa);
        assert_eq!(
            seen[0].selected_text.as_deref(),
            Some("the borrow checker rejects this")
        );
        assert_eq!(seen[1].query_type, crate::types::QueryType::GlobalQa);
        assert_eq!(seen[1].selected_text, None);
    }

    #[tokio::test]
    async fn short_selection_keeps_previous() {
        let mut session = ChatSession::new(ScriptedBackend::remote("s"));
        assert_eq!(
            session.capture_selection("a meaningful passage"),
            SelectionChange::Captured
        );
        assert_eq!(session.capture_selection("tiny"), SelectionChange::Ignored);
        assert_eq!(session.selection(), Some("a meaningful passage"));
        session.clear_selection();
        assert_eq!(session.selection(), None);
    }

    #[tokio::test]
    async fn failure_keeps_selection() {
        let backend = ScriptedBackend::remote("s")
            .reply(Err(Error::from_status(500, Some("rate limited".to_string()), None)));
        let mut session = ChatSession::new(backend);
        session.capture_selection("a meaningful passage");
        assert_eq!(session.submit("Why?").await, SubmitOutcome::Failed);
        assert_eq!(session.selection(), Some("a meaningful passage"));
        assert_eq!(session.messages()[1].text, "rate limited");
        assert_eq!(session.stats().failed_turns, 1);
    }

    #[tokio::test]
    async fn transport_failure_uses_fallback_reply() {
        let backend = ScriptedBackend::remote("s").reply(Err(Error::timeout("slow", None)));
        let mut session = ChatSession::new(backend);
        assert_eq!(session.submit("Hello?").await, SubmitOutcome::Failed);
        assert_eq!(session.messages()[1].text, FALLBACK_REPLY);
        assert_eq!(session.messages()[1].sender, Sender::Bot);
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn sources_are_attached() {
        let backend = ScriptedBackend::remote("s").reply(Ok(QueryResponse::new("answer")
            .with_source_chunks(vec![
                SourceChunk::new("Chapter 1", "One"),
                SourceChunk::new("Chapter 2", "Two"),
            ])));
        let mut session = ChatSession::new(backend);
        session.submit("Sources?").await;
        assert_eq!(session.messages()[1].sources.len(), 2);
        assert_eq!(session.stats().sources_received, 2);
    }

    #[tokio::test]
    async fn unmounting_detaches_listener() {
        let bus = SelectionBus::new();
        let session = ChatSession::mount(ScriptedBackend::remote("s"), &bus);
        assert!(session.is_listening());
        assert_eq!(bus.listener_count(), 1);
        drop(session);
        assert_eq!(bus.listener_count(), 0);
    }

    #[tokio::test]
    async fn reselecting_same_text_is_unchanged() {
        let bus = SelectionBus::new();
        let mut session = ChatSession::mount(ScriptedBackend::remote("s"), &bus);
        bus.release("the same meaningful passage");
        assert_eq!(session.sync_selection().await, Some(SelectionChange::Captured));
        bus.release("  the same meaningful passage ");
        assert_eq!(session.sync_selection().await, Some(SelectionChange::Unchanged));

        bus.release("the same meaningful passage");
        bus.release("tiny");
        assert_eq!(session.sync_selection().await, Some(SelectionChange::Unchanged));
        bus.release("tiny");
        bus.release("a different passage entirely");
        assert_eq!(session.sync_selection().await, Some(SelectionChange::Captured));
        assert_eq!(session.selection(), Some("a different passage entirely"));
    }

    #[tokio::test]
    async fn mount_returns_before_session_is_created() {
        let gate = Arc::new(Notify::new());
        let bus = SelectionBus::new();
        let backend = ScriptedBackend::remote("abc123").gated(gate.clone());
        let mut session = ChatSession::mount(backend, &bus);
        assert!(session.session_id().is_none());
        assert!(session.poll_initialize());
        assert!(session.is_listening());

        gate.notify_one();
        let id = session.wait_initialized().await.cloned();
        assert_eq!(id, Some(SessionId::Remote("abc123".to_string())));
        assert!(!session.poll_initialize());
    }

    #[tokio::test]
    async fn submit_proceeds_while_session_creation_is_pending() {
        let gate = Arc::new(Notify::new());
        let backend = ScriptedBackend::remote("abc123")
            .gated(gate.clone())
            .reply(Ok(QueryResponse::new("answered early")))
            .reply(Ok(QueryResponse::new("answered later")));
        let bus = SelectionBus::new();
        let mut session = ChatSession::mount(backend, &bus);

        assert_eq!(
            session.submit("Before the session exists?").await,
            SubmitOutcome::Answered
        );
        assert!(session.poll_initialize());
        assert!(session.session_id().unwrap().is_fallback());
        let early = session.backend().seen()[0].session_id.clone();
        assert!(early.starts_with("session_"));
        assert_eq!(session.messages()[1].text, "answered early");

        gate.notify_one();
        session.wait_initialized().await;
        assert_eq!(session.submit("And now?").await, SubmitOutcome::Answered);
        assert_eq!(session.backend().seen()[1].session_id, "abc123");
    }

    #[tokio::test]
    async fn failed_background_creation_keeps_on_demand_fallback() {
        let gate = Arc::new(Notify::new());
        let backend = ScriptedBackend::new(Err(Error::connection("refused", None)))
            .gated(gate.clone())
            .reply(Ok(QueryResponse::new("ok")));
        let bus = SelectionBus::new();
        let mut session = ChatSession::mount(backend, &bus);
        session.submit("Hello").await;
        let minted = session.session_id().cloned().unwrap();

        gate.notify_one();
        assert_eq!(session.wait_initialized().await, Some(&minted));
    }

    #[tokio::test]
    async fn dropping_session_before_creation_settles() {
        let gate = Arc::new(Notify::new());
        let bus = SelectionBus::new();
        let backend = ScriptedBackend::remote("s").gated(gate.clone());
        let session = ChatSession::mount(backend, &bus);
        drop(session);
        assert_eq!(bus.listener_count(), 0);
        gate.notify_one();
        tokio::task::yield_now().await;
    }

    #[tokio::test]
    async fn message_ids_increase() {
        let backend = ScriptedBackend::remote("s")
            .reply(Ok(QueryResponse::new("a")))
            .reply(Err(Error::connection("down", None)));
        let mut session = ChatSession::new(backend);
        session.submit("one").await;
        session.submit("two").await;
        let ids: Vec<u64> = session.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn failure_reply_prefers_detail() {
        let err = Error::from_status(400, Some("Query text is required".to_string()), None);
        assert_eq!(failure_reply(&err), "Query text is required");
        assert_eq!(failure_reply(&Error::from_status(502, None, None)), FALLBACK_REPLY);
        assert_eq!(
            failure_reply(&Error::serialization("bad json", None)),
            FALLBACK_REPLY
        );
    }
}
