//! CLI error types and conversions

use crate::export::ExportError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Export run error
    #[error("export error: {0}")]
    ExportError(#[from] ExportError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// The export completed without writing any file
    #[error("no data: {0}")]
    NoData(String),
}

impl CliError {
    /// Process exit code for this error
    ///
    /// `2` when the run completed without data, `1` for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NoData(_) => 2,
            _ => 1,
        }
    }
}
