// Public modules
pub mod error_body;
pub mod message;
pub mod query_request;
pub mod query_response;
pub mod query_type;
pub mod service_status;
pub mod session;
pub mod source_chunk;

// Re-exports
pub use error_body::{ErrorBody, extract_detail};
pub use message::{Message, Sender};
pub use query_request::QueryRequest;
pub use query_response::QueryResponse;
pub use query_type::{QueryType, QueryTypeParseError};
pub use service_status::ServiceStatus;
pub use session::{SessionCreated, SessionId, SessionInfo};
pub use source_chunk::SourceChunk;
