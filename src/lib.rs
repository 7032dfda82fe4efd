//! # Finam Exporter Library
//!
//! Retrieves historical time-series data from the Finam export endpoint and
//! assembles the retrieved pieces into a coherent local dataset.
//!
//! The endpoint caps the date span of a single request depending on the
//! granularity of the data, so every export is split into endpoint-legal
//! segments that are downloaded strictly one after another.
//!
//! ## Features
//!
//! - **Range chunking**: Splits any date interval into segments that respect
//!   the per-granularity span limit (1 day, 3 months, 5 years)
//! - **Bounded retry**: Exponential backoff on 429/5xx with a cancellable sleep
//! - **Corruption heuristic**: Drops segments whose body is an endpoint error
//! - **Merging**: Concatenates multi-segment downloads into a single file
//! - **Progress events**: Ordered, typed event stream for any front end
//! - **Cancellation**: Per-run cancellation signal honoured at every suspension point
//!
//! ## Quick Start
//!
//! ```no_run
//! use finam_exporter::credentials::StaticCredentials;
//! use finam_exporter::export::{ExportOrchestrator, ExportRequest, ProgressEvent};
//! use finam_exporter::Granularity;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let request = ExportRequest::for_year("AAPL", "20569", Granularity::Daily, 2023);
//! let orchestrator = ExportOrchestrator::new(Arc::new(StaticCredentials::new("token")));
//!
//! let outcome = orchestrator
//!     .run(&request, &|event: ProgressEvent| println!("{}", event.message()))
//!     .await?;
//! println!("saved {} file(s)", outcome.saved.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`export`] - Request model, range chunking, progress events and the run orchestrator
//! - [`fetcher`] - Request descriptors, HTTP transport and the retrying fetcher
//! - [`output`] - File system seam, content validation, segment writer and merger
//! - [`credentials`] - Token lookup
//! - [`cancel`] - Per-run cancellation signal
//! - [`metrics`] - Export counters and the optional Prometheus exporter

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-run cancellation signal
pub mod cancel;

/// CLI command implementations
pub mod cli;

/// Credential providers
pub mod credentials;

/// Export orchestration
pub mod export;

/// Endpoint requests and retrying fetcher
pub mod fetcher;

/// Export metrics
pub mod metrics;

/// Segment persistence, validation and merging
pub mod output;

pub use export::{ExportError, ExportOrchestrator, ExportOutcome, ExportRequest, ProgressEvent};

/// Data granularity, carrying the endpoint's numeric period code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Granularity {
    /// Individual trades (code 1)
    Ticks,
    /// 1 minute (code 2)
    OneMinute,
    /// 5 minutes (code 3)
    FiveMinutes,
    /// 10 minutes (code 4)
    TenMinutes,
    /// 15 minutes (code 5)
    FifteenMinutes,
    /// 30 minutes (code 6)
    ThirtyMinutes,
    /// 1 hour (code 7)
    OneHour,
    /// 1 day (code 8)
    Daily,
    /// 1 week (code 9)
    Weekly,
    /// 1 month (code 10)
    Monthly,
}

/// Granularity class that determines the maximum span of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GranularityClass {
    /// Tick data: at most 1 day per request
    Tick,
    /// Minute and hour bars: at most 3 months per request
    Intraday,
    /// Daily, weekly and monthly bars: at most 5 years per request
    DailyOrCoarser,
}

impl Granularity {
    /// All granularities in code order
    pub const ALL: [Granularity; 10] = [
        Granularity::Ticks,
        Granularity::OneMinute,
        Granularity::FiveMinutes,
        Granularity::TenMinutes,
        Granularity::FifteenMinutes,
        Granularity::ThirtyMinutes,
        Granularity::OneHour,
        Granularity::Daily,
        Granularity::Weekly,
        Granularity::Monthly,
    ];

    /// Endpoint period code (`p` parameter)
    pub fn code(&self) -> u8 {
        match self {
            Granularity::Ticks => 1,
            Granularity::OneMinute => 2,
            Granularity::FiveMinutes => 3,
            Granularity::TenMinutes => 4,
            Granularity::FifteenMinutes => 5,
            Granularity::ThirtyMinutes => 6,
            Granularity::OneHour => 7,
            Granularity::Daily => 8,
            Granularity::Weekly => 9,
            Granularity::Monthly => 10,
        }
    }

    /// Span class used by the range chunker
    pub fn class(&self) -> GranularityClass {
        match self.code() {
            1 => GranularityClass::Tick,
            2..=7 => GranularityClass::Intraday,
            _ => GranularityClass::DailyOrCoarser,
        }
    }

    /// Short label ("tick", "1m", "1d", ...)
    pub fn label(&self) -> &'static str {
        match self {
            Granularity::Ticks => "tick",
            Granularity::OneMinute => "1m",
            Granularity::FiveMinutes => "5m",
            Granularity::TenMinutes => "10m",
            Granularity::FifteenMinutes => "15m",
            Granularity::ThirtyMinutes => "30m",
            Granularity::OneHour => "1h",
            Granularity::Daily => "1d",
            Granularity::Weekly => "1w",
            Granularity::Monthly => "1M",
        }
    }
}

impl TryFrom<u8> for Granularity {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Granularity::ALL
            .iter()
            .copied()
            .find(|g| g.code() == code)
            .ok_or_else(|| format!("Invalid granularity code: {code} (expected 1-10)"))
    }
}

impl From<Granularity> for u8 {
    fn from(granularity: Granularity) -> Self {
        granularity.code()
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Granularity {
    type Err = String;

    /// Accepts either the numeric endpoint code ("8") or the label ("1d")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<u8>() {
            return Granularity::try_from(code);
        }
        Granularity::ALL
            .iter()
            .copied()
            .find(|g| g.label() == s)
            .ok_or_else(|| format!("Invalid granularity: {s}"))
    }
}

/// Inclusive date interval with day precision
///
/// Invariant: `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateInterval {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateInterval {
    /// Create an interval, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        if start > end {
            return Err(format!("Start date ({start}) must not be after end date ({end})"));
        }
        Ok(Self { start, end })
    }

    /// Interval covering a whole calendar year (Jan 1 .. Dec 31)
    pub fn calendar_year(year: i32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31)?;
        Some(Self { start, end })
    }

    /// First day of the interval
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the interval
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days between start and end
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl fmt::Display for DateInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}
