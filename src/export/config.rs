//! Export configuration constants

use std::time::Duration;

/// Export resource every segment request is sent to.
pub const EXPORT_BASE_URL: &str = "https://export.finam.ru/export9.out";

/// Maximum number of attempts per segment, first attempt included.
/// Four backoffs of 2s, 4s, 8s and 16s give the endpoint ~30s to recover.
pub const MAX_ATTEMPTS: u32 = 5;

/// Backoff before the first retry, doubled for every further retry.
pub const INITIAL_BACKOFF_MS: u64 = 2000; // 2 seconds

/// Per-attempt network timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Pause before every segment after the first, to stay clear of the
/// endpoint's burst limits.
pub const INTER_SEGMENT_DELAY: Duration = Duration::from_secs(1);

/// Environment variable holding the export token.
pub const TOKEN_ENV_VAR: &str = "FINAM_TOKEN";

/// Token file consulted when the environment variable is unset.
pub const DEFAULT_TOKEN_FILE: &str = "finam_token.txt";

/// Directory created under the output root for all exports.
pub const EXPORT_DIR_NAME: &str = "out";

/// Calculate exponential backoff delay before retry `attempt` (0-based)
pub fn calculate_backoff(attempt: u32) -> Duration {
    calculate_backoff_from(Duration::from_millis(INITIAL_BACKOFF_MS), attempt)
}

/// Exponential backoff from a custom initial delay
pub fn calculate_backoff_from(initial: Duration, attempt: u32) -> Duration {
    initial.saturating_mul(2u32.saturating_pow(attempt))
}

/// Retry settings used by the fetcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per segment, first attempt included
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Per-attempt network timeout
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Backoff before retry `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        calculate_backoff_from(self.initial_backoff, attempt)
    }

    /// Override the attempt budget (at least one attempt is always made)
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
            timeout: REQUEST_TIMEOUT,
        }
    }
}
