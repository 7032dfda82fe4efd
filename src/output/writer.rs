//! Segment file writer

use super::{FileSystem, OutputResult};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Persists validated segments and removes rejected ones
#[derive(Clone)]
pub struct SegmentWriter {
    fs: Arc<dyn FileSystem>,
}

impl SegmentWriter {
    /// Create a writer on top of the given file system
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Write `content` to `path`, creating parent directories and replacing any existing file
    pub fn write(&self, path: &Path, content: &str) -> OutputResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.fs.create_dir_all(parent)?;
            }
        }
        self.fs.write(path, content)?;
        debug!(path = %path.display(), bytes = content.len(), "Segment written");
        Ok(())
    }

    /// Make sure no file is left at `path`
    pub fn reject(&self, path: &Path) -> OutputResult<()> {
        self.fs.remove_file(path)?;
        debug!(path = %path.display(), "Rejected segment removed");
        Ok(())
    }
}
