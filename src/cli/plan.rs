//! Plan command: show how a request would be segmented

use crate::export::{chunk, SegmentLayout};
use clap::Args;
use serde_json::json;

use super::{CliError, OutputFormat, RequestArgs};

/// Plan command arguments
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Request selection
    #[command(flatten)]
    pub request: RequestArgs,
}

/// One planned segment
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PlannedSegment {
    /// 1-based position
    pub index: usize,
    /// First day (dd.mm.yyyy)
    pub from: String,
    /// Last day (dd.mm.yyyy)
    pub to: String,
    /// Destination file
    pub path: String,
}

impl PlanArgs {
    /// Resolve the request into its segment plan
    pub fn plan(&self) -> Result<Vec<PlannedSegment>, CliError> {
        let request = self.request.to_request()?;
        request.validate()?;
        let interval = request.resolve_interval()?;

        let layout = SegmentLayout::for_request(&request);
        let segments = layout.segments(&chunk(&interval, request.period));

        Ok(segments
            .iter()
            .map(|segment| PlannedSegment {
                index: segment.index + 1,
                from: segment.interval.start().format("%d.%m.%Y").to_string(),
                to: segment.interval.end().format("%d.%m.%Y").to_string(),
                path: segment.path.display().to_string(),
            })
            .collect())
    }

    /// Print the plan; never touches the network or the file system
    pub fn execute(&self, format: OutputFormat) -> Result<(), CliError> {
        let plan = self.plan()?;
        match format {
            OutputFormat::Json => {
                println!("{}", json!({ "segments": plan.len(), "plan": plan }));
            }
            OutputFormat::Human => {
                println!("{} segment(s):", plan.len());
                for segment in &plan {
                    println!(
                        "  {:>3}. {} - {}  {}",
                        segment.index, segment.from, segment.to, segment.path
                    );
                }
            }
        }
        Ok(())
    }
}
