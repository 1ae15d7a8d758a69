use std::env;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response, header};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::{
    QueryRequest, QueryResponse, QueryType, ServiceStatus, SessionCreated, SessionInfo,
    extract_detail,
};

/// Backend the published book talks to.
pub const PRODUCTION_BACKEND_URL: &str = "https://hussain3241-ai-book-backend.hf.space";

/// Backend used while the book is served from a loopback host.
pub const LOCAL_BACKEND_URL: &str = "http://localhost:8001";

/// Environment variable that overrides the backend location.
pub const BACKEND_URL_ENV: &str = "BOOK_ASSISTANT_BACKEND_URL";

const SESSION_PATH: &str = "api/chat/session";
const QUERY_PATH: &str = "api/chat/query";
const SELECTION_QUERY_PATH: &str = "api/chat/query/selection";

/// Returns true for host names that refer to the local machine.
pub fn is_loopback_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host.eq_ignore_ascii_case("localhost")
        || host
            .parse::<std::net::IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false)
}

/// Picks the backend base URL.
///
/// An explicit override wins.  Otherwise a front end served from a loopback
/// host talks to the local development backend and everything else talks to
/// production.
pub fn resolve_base_url(override_url: Option<&str>, served_from: Option<&str>) -> String {
    if let Some(url) = override_url.map(str::trim).filter(|u| !u.is_empty()) {
        return url.to_string();
    }
    match served_from {
        Some(host) if is_loopback_host(host) => LOCAL_BACKEND_URL.to_string(),
        _ => PRODUCTION_BACKEND_URL.to_string(),
    }
}

/// Like [`resolve_base_url`], reading the override from [`BACKEND_URL_ENV`].
pub fn resolve_base_url_from_env(served_from: Option<&str>) -> String {
    let from_env = env::var(BACKEND_URL_ENV).ok();
    resolve_base_url(from_env.as_deref(), served_from)
}

/// The operations a chat session needs from its backend.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Opens a new conversational session.
    async fn create_session(&self) -> Result<SessionCreated>;

    /// Answers one query.
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse>;
}

/// Client for the book assistant HTTP API.
#[derive(Debug, Clone)]
pub struct BookAssistant {
    client: ReqwestClient,
    base_url: Url,
    timeout: Option<Duration>,
}

impl BookAssistant {
    /// Create a client for the given base URL with no client-side timeout.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Create a client with custom settings.
    pub fn with_options(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = ReqwestClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {}", e),
                Some(Box::new(e)),
            )
        })?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url)?,
            timeout,
        })
    }

    /// Returns the base URL requests are sent to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the client-side timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                self.timeout.map(|t| t.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        // An unreadable body still yields a status error, just without detail.
        let detail = match response.text().await {
            Ok(body) => extract_detail(&body),
            Err(e) => {
                tracing::debug!(status_code, "failed to read error body: {e}");
                None
            }
        };

        Error::from_status(status_code, detail, retry_after)
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = self.execute_inner(request).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        if let Err(err) = &result {
            CLIENT_REQUEST_ERRORS.click();
            tracing::debug!("backend request failed: {err}");
        }
        result
    }

    async fn execute_inner<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .headers(self.default_headers())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        response.json::<T>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }

    /// Open a new chat session.
    pub async fn create_session(&self) -> Result<SessionCreated> {
        let url = self.endpoint(SESSION_PATH)?;
        tracing::debug!(%url, "creating chat session");
        let created: SessionCreated = self
            .execute(self.client.post(url).json(&serde_json::json!({})))
            .await?;
        if created.session_id.trim().is_empty() {
            return Err(Error::serialization(
                "Backend returned an empty session_id",
                None,
            ));
        }
        Ok(created)
    }

    /// Submit a query.
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let url = self.endpoint(QUERY_PATH)?;
        tracing::debug!(%url, query_type = %request.query_type, "submitting query");
        self.execute(self.client.post(url).json(request)).await
    }

    /// Submit a query to the selection-only endpoint.
    ///
    /// The request must be a `SELECTION_QA` query carrying non-empty selected
    /// text; anything else is rejected before it is sent.
    pub async fn query_selection(&self, request: &QueryRequest) -> Result<QueryResponse> {
        if request.query_type != QueryType::SelectionQa {
            return Err(Error::validation(
                "selection endpoint only accepts SELECTION_QA queries",
                Some("query_type".to_string()),
            ));
        }
        if request
            .selected_text
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .is_empty()
        {
            return Err(Error::validation(
                "selected text is required for selection queries",
                Some("selected_text".to_string()),
            ));
        }
        let url = self.endpoint(SELECTION_QUERY_PATH)?;
        tracing::debug!(%url, "submitting selection query");
        self.execute(self.client.post(url).json(request)).await
    }

    /// Fetch what the backend knows about a session.
    pub async fn session_info(&self, session_id: &str) -> Result<SessionInfo> {
        let mut url = self.endpoint(SESSION_PATH)?;
        url.path_segments_mut()
            .map_err(|_| Error::url("Base URL cannot carry a path", None))?
            .push(session_id);
        self.execute(self.client.get(url)).await
    }

    /// Fetch the backend's banner.
    pub async fn status(&self) -> Result<ServiceStatus> {
        let url = self.base_url.clone();
        self.execute(self.client.get(url)).await
    }
}

#[async_trait::async_trait]
impl ChatBackend for BookAssistant {
    async fn create_session(&self) -> Result<SessionCreated> {
        BookAssistant::create_session(self).await
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        BookAssistant::query(self, request).await
    }
}

fn normalize_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url.trim())?;
    if url.cannot_be_a_base() {
        return Err(Error::url(
            format!("{base_url} cannot be used as a base URL"),
            None,
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
