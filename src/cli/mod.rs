//! CLI command implementations

pub mod error;
pub mod export;
pub mod plan;

pub use error::CliError;
pub use export::{Cli, Commands, ExportArgs, OutputFormat, RequestArgs};
pub use plan::PlanArgs;
