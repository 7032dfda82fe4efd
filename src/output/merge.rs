//! Merging of multi-segment downloads into a single file
//!
//! The first segment file is taken verbatim. Line 1 of every later file is
//! dropped as a repeated header, whether or not that particular segment was
//! requested with a header row. Downstream consumers depend on this exact
//! output shape, so the behaviour is kept as is.

use super::{FileSystem, OutputResult};
use crate::Granularity;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Name of the merged artifact for an instrument, granularity and optional year
///
/// `SBER_2023_p8_merged.txt` for a year-scoped export, `SBER_p8_merged.txt` otherwise.
pub fn merged_file_name(code: &str, period: Granularity, year: Option<i32>) -> String {
    match year {
        Some(year) => format!("{code}_{year}_p{}_merged.txt", period.code()),
        None => format!("{code}_p{}_merged.txt", period.code()),
    }
}

/// Concatenates segment files in order
#[derive(Clone)]
pub struct Merger {
    fs: Arc<dyn FileSystem>,
}

impl Merger {
    /// Create a merger reading through the given file system
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Read `paths` in order and return the merged content
    ///
    /// Line terminators are copied as found, so CRLF input stays CRLF.
    pub fn merge(&self, paths: &[PathBuf]) -> OutputResult<String> {
        let mut output = String::new();

        for (i, path) in paths.iter().enumerate() {
            let content = self.fs.read_to_string(path)?;
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            let mut lines = 0;
            for line in content.split_inclusive('\n').skip(usize::from(i > 0)) {
                output.push_str(line);
                lines += 1;
            }
            debug!(path = %path.display(), lines, "Merged segment file");
        }

        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        Ok(output)
    }
}
