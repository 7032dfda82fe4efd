//! Export orchestration
//!
//! This module turns an [`ExportRequest`] into a sequence of endpoint-legal
//! segment downloads and drives them to completion.
//!
//! # Overview
//!
//! 1. **Planning**: Resolve the date interval and split it with [`chunker::chunk`]
//! 2. **Running**: Build, fetch, validate and write each [`Segment`] in order
//! 3. **Merging**: Optionally concatenate the written segments
//! 4. **Done**: Report the [`ExportOutcome`]
//!
//! Progress is reported through a [`ProgressSink`] as an ordered stream of
//! [`ProgressEvent`]s. A run can be cancelled at any time through
//! [`ExportOrchestrator::cancel`].
//!
//! # Error Handling
//!
//! Per-segment failures (rejected content, exhausted retries, write errors)
//! become [`ProgressEvent::SegmentError`] and the run moves on. Run-level
//! failures ([`ExportError::InvalidRequest`], [`ExportError::Cancelled`],
//! [`ExportError::FatalFailure`]) abort the run and are returned to the caller
//! after a [`ProgressEvent::Error`] has been emitted. A cancelled run ends with
//! [`ProgressEvent::Cancelled`] instead.

pub mod chunker;
pub mod config;
pub mod format;
pub mod orchestrator;
pub mod progress;
pub mod request;
pub mod segment;

pub use chunker::chunk;
pub use orchestrator::{ExportOrchestrator, ExportOutcome, ExportState};
pub use progress::{ProgressEvent, ProgressLog, ProgressSink};
pub use request::ExportRequest;
pub use segment::{Segment, SegmentLayout};

use crate::fetcher::FetchError;
use crate::output::OutputError;

/// Export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Bad or missing request parameters; the run never starts
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Cancelled by the user
    #[error("export cancelled")]
    Cancelled,

    /// Retryable network or server condition that outlasted the retry budget
    #[error("transient failure: {0}")]
    TransientFailure(String),

    /// Non-retryable network or server condition
    #[error("fatal failure: {0}")]
    FatalFailure(String),

    /// Downloaded content judged corrupt
    #[error("segment rejected: {0}")]
    SegmentRejected(String),

    /// File system error
    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

impl ExportError {
    /// Whether this error aborts the whole run rather than a single segment
    pub fn is_run_fatal(&self) -> bool {
        match self {
            ExportError::InvalidRequest(_)
            | ExportError::Cancelled
            | ExportError::FatalFailure(_)
            | ExportError::Output(_) => true,
            ExportError::TransientFailure(_) | ExportError::SegmentRejected(_) => false,
        }
    }
}

impl From<FetchError> for ExportError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Cancelled => ExportError::Cancelled,
            FetchError::TransientFailure { .. } => ExportError::TransientFailure(err.to_string()),
            FetchError::FatalFailure(message) => ExportError::FatalFailure(message),
        }
    }
}
