//! Export command implementation

use crate::credentials::EnvCredentials;
use crate::export::config::{RetryPolicy, DEFAULT_TOKEN_FILE, MAX_ATTEMPTS};
use crate::export::format::{CandleTime, DateFormat, DateTimeFormat, FieldSeparator, TimeFormat};
use crate::export::request::parse_dotted_date;
use crate::export::{ExportOrchestrator, ExportOutcome, ExportRequest, ProgressEvent};
use crate::Granularity;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::{CliError, PlanArgs};

/// Finam Exporter CLI
#[derive(Parser, Debug)]
#[command(name = "finam-exporter")]
#[command(about = "Export historical market data from Finam in endpoint-sized segments", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Token file read when FINAM_TOKEN is not set
    #[arg(long, global = true, default_value = DEFAULT_TOKEN_FILE)]
    pub token_file: PathBuf,

    /// Override the export resource URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Attempts per segment, first attempt included (range: 1-20)
    #[arg(long, global = true, default_value_t = MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_attempts: u32,

    /// Serve Prometheus metrics on this address (e.g., 127.0.0.1:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Build the orchestrator described by the global options
    pub fn build_orchestrator(&self) -> ExportOrchestrator {
        let credentials = EnvCredentials::new().with_token_file(Some(self.token_file.clone()));
        let policy = RetryPolicy::default().with_max_attempts(self.max_attempts);

        let orchestrator =
            ExportOrchestrator::new(Arc::new(credentials)).with_retry_policy(policy);
        match &self.base_url {
            Some(url) => orchestrator.with_base_url(url.as_str()),
            None => orchestrator,
        }
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download an instrument's history
    Export(ExportArgs),

    /// Print the segment plan without contacting the endpoint
    Plan(PlanArgs),
}

/// Request selection shared by `export` and `plan`
#[derive(Args, Debug, Clone, Default)]
pub struct RequestArgs {
    /// Load the whole request from a JSON file
    #[arg(long, conflicts_with_all = ["code", "em", "period"])]
    pub request: Option<PathBuf>,

    /// Instrument code (e.g., SBER)
    #[arg(long)]
    pub code: Option<String>,

    /// Numeric instrument id
    #[arg(long)]
    pub em: Option<String>,

    /// Granularity: endpoint code 1-10 or label (tick, 1m, 5m, 10m, 15m, 30m, 1h, 1d, 1w, 1M)
    #[arg(long)]
    pub period: Option<Granularity>,

    /// First day (dd.mm.yyyy or yyyy-mm-dd)
    #[arg(long, value_parser = parse_cli_date, requires = "to")]
    pub from: Option<NaiveDate>,

    /// Last day (dd.mm.yyyy or yyyy-mm-dd)
    #[arg(long, value_parser = parse_cli_date, requires = "from")]
    pub to: Option<NaiveDate>,

    /// Calendar year, instead of --from/--to
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub year: Option<i32>,

    /// Date format code (1-5)
    #[arg(long, value_parser = parse_code::<DateFormat>)]
    pub datf: Option<DateFormat>,

    /// Date-time format code (1-5)
    #[arg(long, value_parser = parse_code::<DateTimeFormat>)]
    pub dtf: Option<DateTimeFormat>,

    /// Time format code (1-4)
    #[arg(long, value_parser = parse_code::<TimeFormat>)]
    pub tmf: Option<TimeFormat>,

    /// Candle time reference (0 = open, 1 = close)
    #[arg(long, value_parser = parse_code::<CandleTime>)]
    pub msor: Option<CandleTime>,

    /// Field separator code (1-5)
    #[arg(long, value_parser = parse_code::<FieldSeparator>)]
    pub sep: Option<FieldSeparator>,

    /// Market id
    #[arg(long)]
    pub market: Option<u32>,

    /// Contract name (defaults to the code)
    #[arg(long)]
    pub cn: Option<String>,

    /// File name requested from the endpoint
    #[arg(long)]
    pub file_name: Option<String>,

    /// Output root; files land under <output-dir>/out
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Merge segment files into one
    #[arg(long, default_value_t = false)]
    pub merge: bool,

    /// Accepted for request-file compatibility; has no effect
    #[arg(long, default_value_t = false)]
    pub merge_all: bool,

    /// Accepted for request-file compatibility; has no effect
    #[arg(long, default_value_t = false)]
    pub fallback: bool,

    /// Log the planned requests without downloading anything
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

impl RequestArgs {
    /// Build the export request from the flags or the request file
    ///
    /// With `--request`, `--output-dir`, `--merge` and `--dry-run` still apply
    /// on top of the file.
    pub fn to_request(&self) -> Result<ExportRequest, CliError> {
        if let Some(path) = &self.request {
            let content = std::fs::read_to_string(path).map_err(|e| {
                CliError::InvalidArgument(format!("Failed to read {}: {e}", path.display()))
            })?;
            let mut request: ExportRequest = serde_json::from_str(&content).map_err(|e| {
                CliError::InvalidArgument(format!("Invalid request file {}: {e}", path.display()))
            })?;
            if let Some(dir) = &self.output_dir {
                request.output_dir = Some(dir.clone());
            }
            request.merge |= self.merge;
            request.dry_run |= self.dry_run;
            return Ok(request);
        }

        let code = self
            .code
            .clone()
            .ok_or_else(|| CliError::InvalidArgument("--code is required".to_string()))?;
        let em = self
            .em
            .clone()
            .ok_or_else(|| CliError::InvalidArgument("--em is required".to_string()))?;
        let period = self
            .period
            .ok_or_else(|| CliError::InvalidArgument("--period is required".to_string()))?;

        let mut request = ExportRequest::new(code, em, period);
        request.from = self.from;
        request.to = self.to;
        request.year = self.year;
        request.datf = self.datf;
        request.dtf = self.dtf;
        request.tmf = self.tmf;
        request.msor = self.msor;
        request.sep = self.sep;
        request.market = self.market;
        request.cn = self.cn.clone();
        request.file_name = self.file_name.clone();
        request.output_dir = self.output_dir.clone();
        request.merge = self.merge;
        request.merge_all = self.merge_all;
        request.fallback = self.fallback;
        request.dry_run = self.dry_run;
        Ok(request)
    }
}

/// Export command arguments
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Request selection
    #[command(flatten)]
    pub request: RequestArgs,
}

impl ExportArgs {
    /// Run the export, rendering progress as it arrives
    ///
    /// Returns [`CliError::NoData`] when a real run wrote no file.
    pub async fn execute(
        &self,
        cli: &Cli,
        orchestrator: Arc<ExportOrchestrator>,
    ) -> Result<ExportOutcome, CliError> {
        let request = self.request.to_request()?;

        info!(code = %request.code, period = %request.period, "Starting export");

        let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
        let format = cli.output_format;
        let renderer = tokio::spawn(async move {
            let mut view = ProgressView::new(format);
            while let Some(event) = rx.recv().await {
                view.render(&event);
            }
            view.finish();
        });

        let result = orchestrator.run(&request, &tx).await;
        drop(tx);
        if let Err(e) = renderer.await {
            warn!("Progress renderer stopped: {e}");
        }

        match format {
            OutputFormat::Json => output_json(&request, &result),
            OutputFormat::Human => output_human(&request, &result),
        }

        let outcome = result?;
        if outcome.is_zero_yield() && !request.dry_run {
            return Err(CliError::NoData(format!(
                "export of {} produced no usable files ({} rejected, {} failed)",
                request.code, outcome.rejected, outcome.failed
            )));
        }
        Ok(outcome)
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON lines
    Json,
    /// Progress bar and summary
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

/// Parse `dd.mm.yyyy` or `yyyy-mm-dd`
pub fn parse_cli_date(input: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").or_else(|_| parse_dotted_date(input))
}

/// Parse an endpoint option code
pub fn parse_code<T>(input: &str) -> Result<T, String>
where
    T: TryFrom<u8, Error = String>,
{
    let code: u8 = input
        .trim()
        .parse()
        .map_err(|_| format!("'{input}' is not a valid option code"))?;
    T::try_from(code)
}

// ─── Progress rendering ──────────────────────────────────────────────────────

struct ProgressView {
    format: OutputFormat,
    bar: Option<ProgressBar>,
}

impl ProgressView {
    fn new(format: OutputFormat) -> Self {
        Self { format, bar: None }
    }

    fn render(&mut self, event: &ProgressEvent) {
        if self.format == OutputFormat::Json {
            if let Ok(line) = serde_json::to_string(event) {
                println!("{line}");
            }
            return;
        }

        match event {
            ProgressEvent::SegmentsPlanned { total } => {
                self.bar = Some(create_progress_bar(*total as u64));
            }
            ProgressEvent::SegmentStarted { index, .. } => {
                if let Some(bar) = &self.bar {
                    bar.set_position(index.saturating_sub(1) as u64);
                    bar.set_message(event.message());
                }
            }
            ProgressEvent::Sleeping { .. } => {
                if let Some(bar) = &self.bar {
                    bar.set_message(event.message());
                }
            }
            ProgressEvent::SegmentError { .. } => self.println(&format!("warning: {}", event.message())),
            ProgressEvent::FileSaved { .. } | ProgressEvent::Log { .. } => {
                self.println(&event.message())
            }
            ProgressEvent::Done => {
                if let Some(bar) = self.bar.take() {
                    bar.finish_and_clear();
                }
            }
            ProgressEvent::Error { .. } | ProgressEvent::Cancelled => {
                if let Some(bar) = self.bar.take() {
                    bar.abandon_with_message(event.message());
                }
            }
        }
    }

    fn println(&self, line: &str) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => println!("{line}"),
        }
    }

    fn finish(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    bar.set_style(style);
    bar
}

fn output_json(request: &ExportRequest, result: &Result<ExportOutcome, crate::export::ExportError>) {
    let output = match result {
        Ok(outcome) => serde_json::json!({
            "type": "summary",
            "success": true,
            "code": request.code,
            "period": request.period.code(),
            "segments": outcome.segments,
            "saved": outcome.saved,
            "merged": outcome.merged,
            "rejected": outcome.rejected,
            "failed": outcome.failed,
            "dry_run": request.dry_run,
        }),
        Err(e) => serde_json::json!({
            "type": "summary",
            "success": false,
            "code": request.code,
            "period": request.period.code(),
            "error": e.to_string(),
        }),
    };
    println!("{output}");
}

fn output_human(request: &ExportRequest, result: &Result<ExportOutcome, crate::export::ExportError>) {
    match result {
        Ok(outcome) if request.dry_run => {
            println!(
                "\nDry run complete: {} segment(s) planned for {} ({})",
                outcome.segments, request.code, request.period
            );
        }
        Ok(outcome) => {
            println!("\nExport completed for {} ({})", request.code, request.period);
            println!("Segments: {}", outcome.segments);
            println!("Saved: {}", outcome.saved.len());
            if outcome.rejected > 0 {
                println!("Rejected: {}", outcome.rejected);
            }
            if outcome.failed > 0 {
                println!("Failed: {}", outcome.failed);
            }
            if let Some(merged) = &outcome.merged {
                println!("Merged file: {}", merged.display());
            }
        }
        Err(e) => {
            eprintln!("\nExport failed for {}: {e}", request.code);
        }
    }
}
