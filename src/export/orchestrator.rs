//! Export run state machine
//!
//! ```text
//! Planning ──► Running(0) ──► Running(1) ──► … ──► Merging ──► Done
//!     │            │                                  │
//!     └────────────┴──────────► Errored ◄─────────────┘
//! ```
//!
//! Segments are processed strictly one after another. The only suspension
//! points are the courtesy delay between segments, the retry backoff and the
//! network fetch, and all three are interrupted by [`ExportOrchestrator::cancel`].

use super::chunker::chunk;
use super::config::{EXPORT_BASE_URL, INTER_SEGMENT_DELAY};
use super::config::RetryPolicy;
use super::progress::{ProgressEvent, ProgressSink};
use super::request::ExportRequest;
use super::segment::{Segment, SegmentLayout};
use super::ExportError;
use crate::cancel::{CancellationSignal, SharedCancellation};
use crate::credentials::CredentialProvider;
use crate::fetcher::{FetchError, HttpTransport, ReqwestTransport, RequestDescriptor, RetryingFetcher};
use crate::metrics::{ExportRunMetrics, SegmentOutcome};
use crate::output::validator::rejection_reason;
use crate::output::{FileSystem, LocalFileSystem, Merger, SegmentWriter};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};

/// Where the orchestrator is in its current or last run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    /// No run started yet
    Idle,
    /// Resolving the interval and splitting it into segments
    Planning,
    /// Processing the segment at this 0-based index
    Running(usize),
    /// Concatenating downloaded segments
    Merging,
    /// Last run completed
    Done,
    /// Last run aborted
    Errored,
}

/// Result of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOutcome {
    /// Number of planned segments
    pub segments: usize,
    /// Segment files written, in segment order
    pub saved: Vec<PathBuf>,
    /// Merged artifact, when merging ran
    pub merged: Option<PathBuf>,
    /// Segments dropped by the content validator
    pub rejected: usize,
    /// Segments whose fetch or write failed
    pub failed: usize,
}

impl ExportOutcome {
    /// The run finished but produced no usable data
    ///
    /// Dry runs always report zero yield.
    pub fn is_zero_yield(&self) -> bool {
        self.saved.is_empty()
    }
}

/// Drives export runs
///
/// One orchestrator runs at most one export at a time. Each run gets a fresh
/// cancellation signal, so cancelling one run never affects the next.
pub struct ExportOrchestrator {
    credentials: Arc<dyn CredentialProvider>,
    fs: Arc<dyn FileSystem>,
    fetcher: RetryingFetcher,
    base_url: String,
    inter_segment_delay: Duration,
    /// Signal of the active run; `Some` exactly while a run is in progress
    cancellation: Mutex<Option<SharedCancellation>>,
    state: Mutex<ExportState>,
}

impl ExportOrchestrator {
    /// Orchestrator writing to the local disk and fetching over HTTPS
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            credentials,
            fs: Arc::new(LocalFileSystem),
            fetcher: RetryingFetcher::new(Arc::new(ReqwestTransport::new()), RetryPolicy::default()),
            base_url: EXPORT_BASE_URL.to_string(),
            inter_segment_delay: INTER_SEGMENT_DELAY,
            cancellation: Mutex::new(None),
            state: Mutex::new(ExportState::Idle),
        }
    }

    /// Use a different file system
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Use a different HTTP transport
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        let policy = *self.fetcher.policy();
        self.fetcher = RetryingFetcher::new(transport, policy);
        self
    }

    /// Use a different retry policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.fetcher = self.fetcher.with_policy(policy);
        self
    }

    /// Change the pause inserted before every segment after the first
    pub fn with_inter_segment_delay(mut self, delay: Duration) -> Self {
        self.inter_segment_delay = delay;
        self
    }

    /// Send requests to a different export resource
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Current state
    pub fn state(&self) -> ExportState {
        *lock(&self.state)
    }

    /// Whether a run is in progress
    pub fn is_running(&self) -> bool {
        lock(&self.cancellation).is_some()
    }

    /// Cancellation signal of the active run, if any
    pub fn cancellation(&self) -> Option<SharedCancellation> {
        lock(&self.cancellation).clone()
    }

    /// Cancel the active run. No-op when nothing is running.
    pub fn cancel(&self) {
        if let Some(signal) = lock(&self.cancellation).as_ref() {
            info!("Cancellation requested");
            signal.cancel();
        }
    }

    /// Run one export to completion
    ///
    /// Events are delivered to `sink` in order. On a run-level failure an
    /// [`ProgressEvent::Error`] is emitted before the error is returned, or
    /// [`ProgressEvent::Cancelled`] when the run was cancelled.
    ///
    /// # Errors
    ///
    /// - [`ExportError::InvalidRequest`] for bad parameters, a missing token, or
    ///   when another run is already active on this orchestrator
    /// - [`ExportError::Cancelled`] when [`cancel`](Self::cancel) was called
    /// - [`ExportError::FatalFailure`] on a non-retryable endpoint failure
    /// - [`ExportError::Output`] when the merged file cannot be produced
    pub async fn run(
        &self,
        request: &ExportRequest,
        sink: &dyn ProgressSink,
    ) -> Result<ExportOutcome, ExportError> {
        let cancel = {
            let mut slot = lock(&self.cancellation);
            if slot.is_some() {
                return Err(ExportError::InvalidRequest(
                    "export already in progress".to_string(),
                ));
            }
            let cancel = CancellationSignal::shared();
            *slot = Some(Arc::clone(&cancel));
            cancel
        };
        let _running = RunningGuard(&self.cancellation);

        let span = tracing::info_span!(
            "export_run",
            code = %request.code,
            period = request.period.code(),
            dry_run = request.dry_run
        );
        let run_metrics = ExportRunMetrics::start(request.code.as_str(), request.period.code());

        let result = self
            .execute(request, sink, &cancel, &run_metrics)
            .instrument(span)
            .await;

        match &result {
            Ok(outcome) => {
                self.set_state(ExportState::Done);
                run_metrics.record_success(outcome.saved.len());
                if outcome.is_zero_yield() && !request.dry_run {
                    warn!(
                        code = %request.code,
                        rejected = outcome.rejected,
                        failed = outcome.failed,
                        "Export finished without usable data"
                    );
                }
            }
            Err(err) => {
                self.set_state(ExportState::Errored);
                run_metrics.record_failure(&err.to_string());
                sink.emit(match err {
                    ExportError::Cancelled => ProgressEvent::Cancelled,
                    err => ProgressEvent::Error {
                        message: err.to_string(),
                    },
                });
            }
        }

        result
    }

    async fn execute(
        &self,
        request: &ExportRequest,
        sink: &dyn ProgressSink,
        cancel: &CancellationSignal,
        run_metrics: &ExportRunMetrics,
    ) -> Result<ExportOutcome, ExportError> {
        self.set_state(ExportState::Planning);

        request.validate()?;
        let interval = request.resolve_interval()?;
        let token = match self.credentials.token() {
            Some(token) => token,
            None => return Err(ExportError::InvalidRequest("missing token".to_string())),
        };

        if request.merge_all || request.fallback {
            debug!(
                merge_all = request.merge_all,
                fallback = request.fallback,
                "Ignoring mergeAll/fallback flags"
            );
        }

        let layout = SegmentLayout::for_request(request);
        let segments = layout.segments(&chunk(&interval, request.period));
        let total = segments.len();

        info!(%interval, total, directory = %layout.directory().display(), "Export planned");
        sink.emit(ProgressEvent::SegmentsPlanned { total });

        let writer = SegmentWriter::new(Arc::clone(&self.fs));
        let mut outcome = ExportOutcome {
            segments: total,
            ..ExportOutcome::default()
        };

        for segment in &segments {
            if cancel.is_cancelled() {
                return Err(ExportError::Cancelled);
            }

            self.set_state(ExportState::Running(segment.index));
            sink.emit(ProgressEvent::SegmentStarted {
                index: segment.index + 1,
                total,
            });

            if !segment.is_first()
                && !request.dry_run
                && !cancel.sleep(self.inter_segment_delay).await
            {
                return Err(ExportError::Cancelled);
            }

            let descriptor = RequestDescriptor::build(request, segment, &token, segment.is_first())
                .with_resource(self.base_url.as_str());

            if request.dry_run {
                let url = descriptor.redacted_url()?;
                info!(segment = segment.index + 1, "Dry run, skipping request");
                sink.emit(ProgressEvent::Log {
                    message: format!("[DRY RUN] {url}"),
                });
                continue;
            }

            let outcome_kind = self
                .process_segment(segment, &descriptor, &writer, sink, cancel)
                .await?;
            run_metrics.record_segment(outcome_kind);
            match outcome_kind {
                SegmentOutcome::Saved => outcome.saved.push(segment.path.clone()),
                SegmentOutcome::Rejected => outcome.rejected += 1,
                SegmentOutcome::Failed => outcome.failed += 1,
            }
        }

        if request.merge && outcome.saved.len() >= 2 {
            self.set_state(ExportState::Merging);
            sink.emit(ProgressEvent::Log {
                message: "Merging files...".to_string(),
            });

            let merged = layout.merged_path();
            let content = Merger::new(Arc::clone(&self.fs)).merge(&outcome.saved)?;
            writer.write(&merged, &content)?;

            info!(files = outcome.saved.len(), path = %merged.display(), "Segments merged");
            sink.emit(ProgressEvent::FileSaved {
                path: merged.clone(),
            });
            outcome.merged = Some(merged);
        }

        info!(
            saved = outcome.saved.len(),
            rejected = outcome.rejected,
            failed = outcome.failed,
            "Export finished"
        );
        sink.emit(ProgressEvent::Done);
        Ok(outcome)
    }

    /// Fetch, validate and persist one segment. Only run-level failures are returned as errors.
    async fn process_segment(
        &self,
        segment: &Segment,
        descriptor: &RequestDescriptor,
        writer: &SegmentWriter,
        sink: &dyn ProgressSink,
        cancel: &CancellationSignal,
    ) -> Result<SegmentOutcome, ExportError> {
        let fetched = self
            .fetcher
            .fetch(descriptor, cancel, |seconds| {
                sink.emit(ProgressEvent::Sleeping { seconds })
            })
            .await;

        let content = match fetched {
            Ok(content) => content,
            Err(err @ FetchError::TransientFailure { .. }) => {
                warn!(segment = segment.index + 1, error = %err, "Segment download failed");
                sink.emit(ProgressEvent::SegmentError {
                    message: format!(
                        "Failed to download {}: {}",
                        segment.file_name,
                        ExportError::from(err)
                    ),
                });
                return Ok(SegmentOutcome::Failed);
            }
            Err(err) => return Err(err.into()),
        };

        if let Some(phrase) = rejection_reason(&content) {
            if let Err(e) = writer.reject(&segment.path) {
                warn!(path = %segment.path.display(), error = %e, "Could not remove rejected segment");
            }
            let err = ExportError::SegmentRejected(format!(
                "{} contains an endpoint error ('{phrase}') and was discarded",
                segment.file_name
            ));
            warn!(segment = segment.index + 1, body = %content.trim(), "{}", err);
            sink.emit(ProgressEvent::SegmentError {
                message: err.to_string(),
            });
            return Ok(SegmentOutcome::Rejected);
        }

        match writer.write(&segment.path, &content) {
            Ok(()) => {
                info!(segment = segment.index + 1, path = %segment.path.display(), "Segment saved");
                sink.emit(ProgressEvent::FileSaved {
                    path: segment.path.clone(),
                });
                Ok(SegmentOutcome::Saved)
            }
            Err(e) => {
                warn!(segment = segment.index + 1, error = %e, "Segment write failed");
                sink.emit(ProgressEvent::SegmentError {
                    message: format!("Failed to write {}: {e}", segment.file_name),
                });
                Ok(SegmentOutcome::Failed)
            }
        }
    }

    fn set_state(&self, state: ExportState) {
        debug!(?state, "Export state changed");
        *lock(&self.state) = state;
    }
}

/// Frees the run slot when the run ends, however it ends
struct RunningGuard<'a>(&'a Mutex<Option<SharedCancellation>>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        *lock(self.0) = None;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
