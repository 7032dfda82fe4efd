//! Progress events emitted by an export run
//!
//! Events are delivered synchronously, in the order the orchestrator
//! produces them. `SegmentsPlanned` always comes first and a successful run
//! always ends with `Done`; a failed run ends with `Error`, or with
//! `Cancelled` when it was stopped on request.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;

/// A single progress notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProgressEvent {
    /// The interval was split into `total` segments
    SegmentsPlanned {
        /// Number of segments in the run
        total: usize,
    },
    /// Segment `index` (1-based) of `total` is being processed
    SegmentStarted {
        /// 1-based segment position
        index: usize,
        /// Number of segments in the run
        total: usize,
    },
    /// A segment or merged file was written
    FileSaved {
        /// Path of the written file
        path: PathBuf,
    },
    /// A segment failed; the run continues
    SegmentError {
        /// What went wrong
        message: String,
    },
    /// The fetcher is backing off before a retry
    Sleeping {
        /// Backoff length in whole seconds
        seconds: u64,
    },
    /// Informational message
    Log {
        /// Message text
        message: String,
    },
    /// The run failed; no further events follow
    Error {
        /// What went wrong
        message: String,
    },
    /// The run was cancelled; no further events follow
    Cancelled,
    /// The run completed
    Done,
}

impl ProgressEvent {
    /// Human-readable status line for this event
    pub fn message(&self) -> String {
        match self {
            ProgressEvent::SegmentsPlanned { total } => {
                format!("Split into {total} segment(s)")
            }
            ProgressEvent::SegmentStarted { index, total } => {
                format!("Downloading segment {index}/{total}...")
            }
            ProgressEvent::FileSaved { path } => format!("Saved: {}", path.display()),
            ProgressEvent::SegmentError { message }
            | ProgressEvent::Log { message }
            | ProgressEvent::Error { message } => message.clone(),
            ProgressEvent::Sleeping { seconds } => {
                format!("Waiting {seconds}s before retry...")
            }
            ProgressEvent::Cancelled => "Export cancelled".to_string(),
            ProgressEvent::Done => "Export finished".to_string(),
        }
    }

    /// Whether this event ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Done | ProgressEvent::Error { .. } | ProgressEvent::Cancelled
        )
    }
}

/// Receiver of progress events
///
/// Implementations must not block for long; the orchestrator does not buffer.
pub trait ProgressSink: Send + Sync {
    /// Handle one event
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Forwards events to a channel drained by another task. Events sent after
/// the receiver is dropped are discarded.
impl ProgressSink for UnboundedSender<ProgressEvent> {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.send(event);
    }
}

/// Collects every event in memory
#[derive(Debug, Default)]
pub struct ProgressLog {
    events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of events received so far
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether no event has been received yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProgressSink for ProgressLog {
    fn emit(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
