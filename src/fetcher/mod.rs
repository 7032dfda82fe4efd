//! Export endpoint access
//!
//! - [`query`] - Maps a request and segment to the endpoint's flat parameter set
//! - [`retry`] - Bounded, cancellable retry around a single fetch
//! - [`http`] - [`HttpTransport`] backed by `reqwest`
//! - [`retry_formatter`] - Retry and failure log messages

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use std::time::Duration;

pub mod http;
pub mod query;
pub mod retry;
pub mod retry_formatter;

pub use http::ReqwestTransport;
pub use query::RequestDescriptor;
pub use retry::RetryingFetcher;

/// Fetch errors
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The run's cancellation signal was raised
    #[error("export cancelled")]
    Cancelled,

    /// Retryable status (429 or 5xx) on every attempt
    #[error("gave up after {attempts} attempt(s), last status {status}")]
    TransientFailure {
        /// Status of the last attempt
        status: StatusCode,
        /// Attempts made
        attempts: u32,
    },

    /// Non-retryable status, or no HTTP response at all
    #[error("{0}")]
    FatalFailure(String),
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Response of one HTTP attempt
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Raw body
    pub body: Bytes,
}

impl HttpResponse {
    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Failure that produced no HTTP status
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// No response within the per-attempt timeout
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other transport-level failure
    #[error("request failed: {0}")]
    Other(String),
}

/// GET transport used by [`RetryingFetcher`]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `GET url?params` and return the full response
    async fn get(
        &self,
        url: &str,
        params: &[(&'static str, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;
}

/// Whether a status is worth retrying (429 or any 5xx)
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
