use std::time::Duration;

use finam_exporter::fetcher::retry_formatter::{RetryContext, RetryErrorType};
use finam_exporter::fetcher::TransportError;
use reqwest::StatusCode;

fn sample_context(error_type: RetryErrorType) -> RetryContext {
    RetryContext::new(
        2,
        5,
        error_type,
        Duration::from_secs(4),
        "SBER 01.01.2023-31.12.2023",
        "503 Service Unavailable",
    )
}

#[test]
fn format_retry_captures_attempt_and_wait() {
    let message = sample_context(RetryErrorType::RateLimit).format_retry();
    assert!(message.contains("attempt 2/5"));
    assert!(message.contains("rate limit exceeded"));
    assert!(message.contains("4.0 seconds"));
    assert!(message.contains("(SBER 01.01.2023-31.12.2023)"));
}

#[test]
fn format_failure_lists_suggestions() {
    let output = sample_context(RetryErrorType::ServerError(502)).format_failure();
    assert!(output.contains("failed after 2 attempt(s)"));
    assert!(output.contains("503 Service Unavailable"));
    assert!(output.contains("try again later"));
    assert!(output.contains("--max-attempts (current: 5)"));
}

#[test]
fn non_retryable_failure_has_no_attempt_hint() {
    let output = sample_context(RetryErrorType::AuthFailed(401)).format_failure();
    assert!(output.contains("export token"));
    assert!(!output.contains("--max-attempts"));
}

#[test]
fn failure_without_target_says_unknown() {
    let ctx = RetryContext::new(1, 1, RetryErrorType::NetworkGeneric, Duration::ZERO, "", "boom");
    assert!(ctx.format_failure().contains("Segment: unknown"));
    assert!(!ctx.format_retry().contains('('));
}

#[test]
fn classification_from_status_and_transport() {
    assert_eq!(
        RetryErrorType::from(StatusCode::TOO_MANY_REQUESTS),
        RetryErrorType::RateLimit
    );
    assert_eq!(
        RetryErrorType::from(StatusCode::INTERNAL_SERVER_ERROR),
        RetryErrorType::ServerError(500)
    );
    assert_eq!(
        RetryErrorType::from(StatusCode::UNAUTHORIZED),
        RetryErrorType::AuthFailed(401)
    );
    assert_eq!(
        RetryErrorType::from(&TransportError::Connect("refused".into())),
        RetryErrorType::NetworkOffline
    );
    assert!(!RetryErrorType::NetworkTimeout.is_retryable());
}
