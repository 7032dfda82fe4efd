//! Export observability metrics
//!
//! Counters and histograms are recorded through the `metrics` facade and are
//! no-ops until a recorder is installed. The CLI installs the Prometheus
//! exporter when `--metrics-addr` is given.
//!
//! ## Metrics
//!
//! - `export_http_requests_total{status}` - requests sent to the export endpoint
//! - `export_http_request_duration_seconds` - request latency
//! - `export_retries_total` / `export_backoff_seconds` - retry backoffs
//! - `export_segments_total{outcome}` - saved, rejected and failed segments
//! - `export_runs_total{result}` - finished runs

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

static METRICS_INITIALIZED: Lazy<RwLock<bool>> = Lazy::new(|| RwLock::new(false));

static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Install the Prometheus exporter and register metric descriptions
///
/// Idempotent: later calls return `Ok(())` without rebinding.
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "export_http_requests_total",
        Unit::Count,
        "Requests sent to the export endpoint"
    );
    describe_histogram!(
        "export_http_request_duration_seconds",
        Unit::Seconds,
        "Export endpoint request duration"
    );
    describe_counter!("export_retries_total", Unit::Count, "Retry attempts");
    describe_histogram!(
        "export_backoff_seconds",
        Unit::Seconds,
        "Backoff before a retry"
    );
    describe_counter!(
        "export_segments_total",
        Unit::Count,
        "Processed segments by outcome"
    );
    describe_counter!("export_runs_total", Unit::Count, "Finished export runs");

    *initialized = true;
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

/// Whether [`init_metrics`] has completed
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}

/// New correlation ID for request tracing (`req-0000002a`)
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Timing and status of one request attempt
pub struct HttpRequestMetrics {
    target: String,
    start_time: Instant,
    correlation_id: String,
    attempt: u32,
}

impl HttpRequestMetrics {
    /// Start timing an attempt against `target`
    pub fn start(target: impl Into<String>, attempt: u32) -> Self {
        let target = target.into();
        let correlation_id = generate_correlation_id();

        debug!(
            correlation_id = %correlation_id,
            target = %target,
            attempt,
            "Sending export request"
        );

        Self {
            target,
            start_time: Instant::now(),
            correlation_id,
            attempt,
        }
    }

    /// Record a response with an HTTP status
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!("export_http_requests_total", "status" => status_code.to_string()).increment(1);
        histogram!("export_http_request_duration_seconds").record(duration.as_secs_f64());

        if status_code == 429 {
            warn!(
                correlation_id = %self.correlation_id,
                target = %self.target,
                attempt = self.attempt,
                "Export endpoint rate limited the request (429)"
            );
        }

        debug!(
            correlation_id = %self.correlation_id,
            status = status_code,
            duration_ms = duration.as_millis() as u64,
            "Export request completed"
        );
    }

    /// Record an attempt that produced no HTTP status
    pub fn record_network_error(&self) {
        let duration = self.start_time.elapsed();

        counter!("export_http_requests_total", "status" => "network_error").increment(1);
        histogram!("export_http_request_duration_seconds").record(duration.as_secs_f64());

        warn!(
            correlation_id = %self.correlation_id,
            target = %self.target,
            attempt = self.attempt,
            duration_ms = duration.as_millis() as u64,
            "Export request failed without a response"
        );
    }

    /// Correlation ID of this attempt
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Record a retry backoff
pub fn record_retry_backoff(duration: Duration, attempt: u32) {
    counter!("export_retries_total").increment(1);
    histogram!("export_backoff_seconds").record(duration.as_secs_f64());

    debug!(attempt, backoff_ms = duration.as_millis() as u64, "Retry backoff recorded");
}

/// What happened to one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentOutcome {
    /// Written to disk
    Saved,
    /// Dropped by the content validator
    Rejected,
    /// Fetch or write failed
    Failed,
}

impl SegmentOutcome {
    /// Label value used in `export_segments_total`
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentOutcome::Saved => "saved",
            SegmentOutcome::Rejected => "rejected",
            SegmentOutcome::Failed => "failed",
        }
    }
}

/// Metrics for one export run
pub struct ExportRunMetrics {
    code: String,
    period: u8,
    start_time: Instant,
}

impl ExportRunMetrics {
    /// Start tracking a run
    pub fn start(code: impl Into<String>, period: u8) -> Self {
        Self {
            code: code.into(),
            period,
            start_time: Instant::now(),
        }
    }

    /// Count a processed segment
    pub fn record_segment(&self, outcome: SegmentOutcome) {
        counter!("export_segments_total", "outcome" => outcome.as_str()).increment(1);
    }

    /// Record a run that reached `Done`
    pub fn record_success(&self, saved: usize) {
        let result = if saved == 0 { "empty" } else { "ok" };
        counter!("export_runs_total", "result" => result).increment(1);

        info!(
            code = %self.code,
            period = self.period,
            saved,
            duration_secs = self.start_time.elapsed().as_secs(),
            "Export run completed"
        );
    }

    /// Record a run that aborted
    pub fn record_failure(&self, error: &str) {
        counter!("export_runs_total", "result" => "error").increment(1);

        error!(
            code = %self.code,
            period = self.period,
            error = %error,
            duration_secs = self.start_time.elapsed().as_secs(),
            "Export run failed"
        );
    }
}
