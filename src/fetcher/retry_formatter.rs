//! Retry and failure messages for the export fetcher.

use super::TransportError;
use reqwest::StatusCode;
use std::time::Duration;

/// Classification of a failed attempt for user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// No response within the per-attempt timeout
    NetworkTimeout,
    /// Connection refused, DNS failure or similar
    NetworkOffline,
    /// HTTP 429
    RateLimit,
    /// HTTP 5xx
    ServerError(u16),
    /// HTTP 401/403, usually a bad token
    AuthFailed(u16),
    /// Other non-success statuses
    ClientError(u16),
    /// Anything else without a status
    NetworkGeneric,
}

impl RetryErrorType {
    /// Short description used inside log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "network timeout",
            Self::NetworkOffline => "connection failed",
            Self::RateLimit => "rate limit exceeded",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::AuthFailed(_) => "authentication failed",
            Self::ClientError(code) => match code {
                404 => "resource not found",
                _ => "client error",
            },
            Self::NetworkGeneric => "network error",
        }
    }

    /// Suggested remediation shown after a final failure.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "Check your network connection and firewall settings",
            Self::NetworkOffline => "Verify internet connectivity and DNS resolution",
            Self::RateLimit => "Wait a few minutes before starting another export",
            Self::ServerError(_) => "The export service may be having issues, try again later",
            Self::AuthFailed(_) => "Check that the export token is valid and not expired",
            Self::ClientError(_) => "Check the instrument id, code and date range",
            Self::NetworkGeneric => "Check network connectivity and try again",
        }
    }

    /// Whether attempts failing this way are retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::ServerError(_))
    }
}

impl From<StatusCode> for RetryErrorType {
    fn from(status: StatusCode) -> Self {
        let code = status.as_u16();
        match code {
            429 => Self::RateLimit,
            401 | 403 => Self::AuthFailed(code),
            _ if status.is_server_error() => Self::ServerError(code),
            _ => Self::ClientError(code),
        }
    }
}

impl From<&TransportError> for RetryErrorType {
    fn from(err: &TransportError) -> Self {
        match err {
            TransportError::Timeout(_) => Self::NetworkTimeout,
            TransportError::Connect(_) => Self::NetworkOffline,
            TransportError::Other(_) => Self::NetworkGeneric,
        }
    }
}

/// Context of one failed attempt.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Attempt that failed (1-based)
    pub attempt: u32,
    /// Attempt budget
    pub max_attempts: u32,
    /// Failure classification
    pub error_type: RetryErrorType,
    /// Wait before the next attempt
    pub backoff_duration: Duration,
    /// What was being fetched (`SBER 01.01.2023-31.12.2023`)
    pub target: String,
    /// Underlying error text
    pub error_message: String,
}

impl RetryContext {
    /// Build a context for a failed attempt.
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        error_type: RetryErrorType,
        backoff_duration: Duration,
        target: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type,
            backoff_duration,
            target: target.into(),
            error_message: error_message.into(),
        }
    }

    /// `Retrying (attempt 1/5) after service unavailable - waiting 2.0 seconds... (SBER ...)`
    pub fn format_retry(&self) -> String {
        let mut message = format!(
            "Retrying (attempt {}/{}) after {} - waiting {:.1} seconds...",
            self.attempt,
            self.max_attempts,
            self.error_type.description(),
            self.backoff_duration.as_secs_f64()
        );
        append_target(&mut message, &self.target);
        message
    }

    /// Multi-line failure summary with suggestions.
    pub fn format_failure(&self) -> String {
        let target = if self.target.is_empty() {
            "unknown"
        } else {
            &self.target
        };

        let mut lines = vec![
            format!("[FAILED] Export request failed after {} attempt(s)", self.attempt),
            format!("  Last error: {}", self.error_message),
            format!("  Segment: {target}"),
            "  Suggestions:".to_string(),
        ];
        lines.push(format!("    - {}", self.error_type.suggestion()));
        if self.error_type.is_retryable() {
            lines.push(format!(
                "    - Try increasing --max-attempts (current: {})",
                self.max_attempts
            ));
        }
        lines.join("\n")
    }
}

fn append_target(buffer: &mut String, target: &str) {
    if !target.is_empty() {
        buffer.push_str(" (");
        buffer.push_str(target);
        buffer.push(')');
    }
}
