//! Segment naming and destination layout
//!
//! Every segment is written to a two or three level directory under the
//! export root:
//!
//! ```text
//! {outputDir}/out/{code}/p{period}/{year}/{code}_{yymmdd}_{yymmdd}.txt   (year-scoped)
//! {outputDir}/out/{code}/p{period}/{code}_{yymmdd}_{yymmdd}.txt          (explicit range)
//! ```
//!
//! # Usage Example
//!
//! ```rust
//! use finam_exporter::export::{ExportRequest, SegmentLayout};
//! use finam_exporter::{DateInterval, Granularity};
//! use std::path::PathBuf;
//!
//! let mut request = ExportRequest::for_year("SBER", "3", Granularity::Daily, 2023);
//! request.output_dir = Some(PathBuf::from("data"));
//!
//! let layout = SegmentLayout::for_request(&request);
//! let segment = layout.segment(0, DateInterval::calendar_year(2023).unwrap());
//! assert_eq!(
//!     segment.path,
//!     PathBuf::from("data/out/SBER/p8/2023/SBER_230101_231231.txt")
//! );
//! ```

use super::ExportRequest;
use crate::output::merged_file_name;
use crate::{DateInterval, Granularity};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// One chunk of an export, with its derived destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Position in the run, starting at 0
    pub index: usize,
    /// Date range covered by this segment
    pub interval: DateInterval,
    /// File name (`{code}_{yymmdd}_{yymmdd}.txt`)
    pub file_name: String,
    /// Full destination path
    pub path: PathBuf,
}

impl Segment {
    /// File name without the `.txt` extension, as sent in the `f` parameter
    pub fn stem(&self) -> &str {
        self.file_name
            .strip_suffix(".txt")
            .unwrap_or(&self.file_name)
    }

    /// Whether this is the first segment of the run
    pub fn is_first(&self) -> bool {
        self.index == 0
    }
}

/// Destination layout shared by all segments of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentLayout {
    directory: PathBuf,
    code: String,
    period: Granularity,
    year: Option<i32>,
}

impl SegmentLayout {
    /// Derive the layout from a request
    ///
    /// The instrument code is sanitized before it becomes a path component,
    /// so a code such as `../etc` cannot escape the export root.
    pub fn for_request(request: &ExportRequest) -> Self {
        let code = sanitize_code(&request.code);
        let mut directory = request
            .export_root()
            .join(&code)
            .join(format!("p{}", request.period.code()));
        if let Some(year) = request.year {
            directory = directory.join(year.to_string());
        }

        Self {
            directory,
            code,
            period: request.period,
            year: request.year,
        }
    }

    /// Directory all segment files and the merged file are written to
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Build the segment at `index` covering `interval`
    pub fn segment(&self, index: usize, interval: DateInterval) -> Segment {
        let file_name = segment_file_name(&self.code, &interval);
        let path = self.directory.join(&file_name);
        Segment {
            index,
            interval,
            file_name,
            path,
        }
    }

    /// Build segments for an ordered list of chunks
    pub fn segments(&self, chunks: &[DateInterval]) -> Vec<Segment> {
        chunks
            .iter()
            .enumerate()
            .map(|(index, interval)| self.segment(index, *interval))
            .collect()
    }

    /// Destination of the merged artifact
    pub fn merged_path(&self) -> PathBuf {
        self.directory
            .join(merged_file_name(&self.code, self.period, self.year))
    }
}

/// Two-digit-year date used in file names (`yymmdd`)
pub fn format_file_date(date: NaiveDate) -> String {
    date.format("%y%m%d").to_string()
}

/// `{code}_{yymmdd}_{yymmdd}.txt`
pub fn segment_file_name(code: &str, interval: &DateInterval) -> String {
    format!("{}.txt", segment_stem(code, interval))
}

/// `{code}_{yymmdd}_{yymmdd}`
pub fn segment_stem(code: &str, interval: &DateInterval) -> String {
    format!(
        "{code}_{}_{}",
        format_file_date(interval.start()),
        format_file_date(interval.end())
    )
}

/// Make an instrument code safe to use as a path component
///
/// - `..` → `__`
/// - `/`, `\`, `:` → `_`
///
/// Case is preserved.
pub fn sanitize_code(code: &str) -> String {
    code.trim().replace("..", "__").replace(['/', '\\', ':'], "_")
}
