//! `reqwest`-backed HTTP transport
//!
//! Sends a single GET per call. Retry lives in
//! [`RetryingFetcher`](super::RetryingFetcher), so this client never retries
//! on its own.

use super::{HttpResponse, HttpTransport, TransportError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// User agent sent with every export request
pub const USER_AGENT: &str = concat!("finam-exporter/", env!("CARGO_PKG_VERSION"));

/// HTTP transport over a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with a default client
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Create a transport over an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        params: &[(&'static str, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        debug!("GET {} with {} params", url, params.len());

        let response = self
            .client
            .get(url)
            .query(params)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| classify(e, timeout))?;

        Ok(HttpResponse { status, body })
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}
