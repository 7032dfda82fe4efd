//! Bounded, cancellable retry around a single export fetch
//!
//! Only 429 and 5xx responses are retried, with exponential backoff
//! (2s, 4s, 8s, 16s by default). Any other non-success status and any
//! failure that produced no HTTP status at all end the fetch immediately.

use super::retry_formatter::{RetryContext, RetryErrorType};
use super::{
    is_retryable_status, FetchError, FetchResult, HttpTransport, RequestDescriptor,
    TransportError,
};
use crate::cancel::CancellationSignal;
use crate::export::config::RetryPolicy;
use crate::metrics::{record_retry_backoff, HttpRequestMetrics};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Fetches one request descriptor with retry
#[derive(Clone)]
pub struct RetryingFetcher {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    /// Create a fetcher over `transport`
    pub fn new(transport: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Retry policy in use
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Replace the retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fetch `descriptor` and return the response body as text
    ///
    /// `on_sleep` receives the backoff length in whole seconds right before
    /// each backoff starts.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Cancelled`] if `cancel` is raised before or during any attempt or backoff
    /// - [`FetchError::TransientFailure`] when every attempt got 429 or 5xx
    /// - [`FetchError::FatalFailure`] on any other non-success status, or when no response arrived
    pub async fn fetch<F>(
        &self,
        descriptor: &RequestDescriptor,
        cancel: &CancellationSignal,
        mut on_sleep: F,
    ) -> FetchResult<String>
    where
        F: FnMut(u64) + Send,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let target = descriptor.describe();
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let metrics = HttpRequestMetrics::start(target.as_str(), attempt + 1);
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                result = self.send(descriptor) => result,
            };

            let response = match result {
                Ok(response) => response,
                Err(err) => {
                    metrics.record_network_error();
                    let ctx = RetryContext::new(
                        attempt + 1,
                        max_attempts,
                        RetryErrorType::from(&err),
                        Duration::ZERO,
                        target.as_str(),
                        err.to_string(),
                    );
                    error!("{}", ctx.format_failure());
                    return Err(FetchError::FatalFailure(err.to_string()));
                }
            };

            let status = response.status;
            metrics.record_complete(status.as_u16());

            if status.is_success() {
                debug!(attempt = attempt + 1, bytes = response.body.len(), "Export request succeeded");
                return Ok(response.text());
            }

            let error_type = RetryErrorType::from(status);
            if !is_retryable_status(status) {
                let ctx = RetryContext::new(
                    attempt + 1,
                    max_attempts,
                    error_type,
                    Duration::ZERO,
                    target.as_str(),
                    status.to_string(),
                );
                error!("{}", ctx.format_failure());
                return Err(FetchError::FatalFailure(format!(
                    "export endpoint returned {status}"
                )));
            }

            if attempt + 1 >= max_attempts {
                let ctx = RetryContext::new(
                    attempt + 1,
                    max_attempts,
                    error_type,
                    Duration::ZERO,
                    target.as_str(),
                    status.to_string(),
                );
                warn!("{}", ctx.format_failure());
                return Err(FetchError::TransientFailure {
                    status,
                    attempts: attempt + 1,
                });
            }

            let backoff = self.policy.backoff(attempt);
            let ctx = RetryContext::new(
                attempt + 1,
                max_attempts,
                error_type,
                backoff,
                target.as_str(),
                status.to_string(),
            );
            warn!("{}", ctx.format_retry());
            record_retry_backoff(backoff, attempt);

            on_sleep(backoff.as_secs_f64().round() as u64);
            if !cancel.sleep(backoff).await {
                debug!(attempt = attempt + 1, "Backoff interrupted by cancellation");
                return Err(FetchError::Cancelled);
            }

            attempt += 1;
        }
    }

    async fn send(&self, descriptor: &RequestDescriptor) -> Result<super::HttpResponse, TransportError> {
        let timeout = self.policy.timeout;
        match tokio::time::timeout(
            timeout,
            self.transport
                .get(&descriptor.resource, &descriptor.params, timeout),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(timeout)),
        }
    }
}
