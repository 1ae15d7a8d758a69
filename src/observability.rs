use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("book_assistant.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter =
    Counter::new("book_assistant.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("book_assistant.client.request_duration_seconds");

pub(crate) static SESSIONS_CREATED: Counter = Counter::new("book_assistant.session.created");
pub(crate) static SESSION_FALLBACKS: Counter = Counter::new("book_assistant.session.fallbacks");

pub(crate) static QUERIES_SUBMITTED: Counter = Counter::new("book_assistant.query.submitted");
pub(crate) static QUERIES_IGNORED: Counter = Counter::new("book_assistant.query.ignored");
pub(crate) static QUERY_FAILURES: Counter = Counter::new("book_assistant.query.failures");
pub(crate) static QUERY_SOURCES: Moments = Moments::new("book_assistant.query.source_chunks");

pub(crate) static SELECTIONS_CAPTURED: Counter =
    Counter::new("book_assistant.selection.captured");
pub(crate) static SELECTIONS_IGNORED: Counter = Counter::new("book_assistant.selection.ignored");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&SESSIONS_CREATED);
    collector.register_counter(&SESSION_FALLBACKS);

    collector.register_counter(&QUERIES_SUBMITTED);
    collector.register_counter(&QUERIES_IGNORED);
    collector.register_counter(&QUERY_FAILURES);
    collector.register_moments(&QUERY_SOURCES);

    collector.register_counter(&SELECTIONS_CAPTURED);
    collector.register_counter(&SELECTIONS_IGNORED);
}
