//! Segment persistence, validation and merging
//!
//! Everything the export run does on disk goes through the [`FileSystem`]
//! trait so the orchestrator can be driven against a real directory tree or
//! an in-memory stand-in.
//!
//! - [`validator`] - Coarse corruption heuristic for downloaded bodies
//! - [`writer`] - Writes accepted segments and removes rejected ones
//! - [`merge`] - Concatenates segment files, stripping repeated headers

use std::path::{Path, PathBuf};

pub mod merge;
pub mod validator;
pub mod writer;

pub use merge::{merged_file_name, Merger};
pub use validator::is_usable;
pub use writer::SegmentWriter;

/// Output errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error on a specific path
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// Path the operation was performed on
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// File content is not valid UTF-8
    #[error("file {} is not valid UTF-8", .0.display())]
    InvalidUtf8(PathBuf),
}

impl OutputError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::InvalidData {
            return OutputError::InvalidUtf8(path.to_path_buf());
        }
        OutputError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// File system operations needed by an export run
pub trait FileSystem: Send + Sync {
    /// Create a directory and all missing parents. Succeeds if it already exists.
    fn create_dir_all(&self, path: &Path) -> OutputResult<()>;

    /// Create or overwrite a UTF-8 text file
    fn write(&self, path: &Path, contents: &str) -> OutputResult<()>;

    /// Read a UTF-8 text file
    fn read_to_string(&self, path: &Path) -> OutputResult<String>;

    /// Delete a file. Succeeds if the file does not exist.
    fn remove_file(&self, path: &Path) -> OutputResult<()>;
}

/// [`FileSystem`] backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn create_dir_all(&self, path: &Path) -> OutputResult<()> {
        std::fs::create_dir_all(path).map_err(|e| OutputError::io(path, e))
    }

    fn write(&self, path: &Path, contents: &str) -> OutputResult<()> {
        std::fs::write(path, contents).map_err(|e| OutputError::io(path, e))
    }

    fn read_to_string(&self, path: &Path) -> OutputResult<String> {
        std::fs::read_to_string(path).map_err(|e| OutputError::io(path, e))
    }

    fn remove_file(&self, path: &Path) -> OutputResult<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OutputError::io(path, e)),
        }
    }
}
