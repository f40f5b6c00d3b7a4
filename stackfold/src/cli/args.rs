//! CLI argument definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::domain::{FlameGraphError, TimeWindow};
use crate::export::ExportFormat;

#[derive(Parser)]
#[command(
    name = "stackfold",
    about = "Build a weighted flame graph from sampled stack traces",
    after_help = "\
EXAMPLES:
    stackfold fetch.json                             JSON flame graph to stdout
    stackfold fetch.json --total-seconds 900 -o fg.json
    stackfold fetch.json --start 1700000000 --end 1700000900
    stackfold - --format folded | inferno-flamegraph > fg.svg"
)]
pub struct Args {
    /// Fetch result JSON document (`-` reads stdin)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Write the flame graph to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Length of the query window in seconds
    #[arg(long, value_name = "SECS", conflicts_with_all = ["start", "end"])]
    pub total_seconds: Option<f64>,

    /// Query window start (unix seconds)
    #[arg(long, requires = "end")]
    pub start: Option<f64>,

    /// Query window end (unix seconds)
    #[arg(long, requires = "start")]
    pub end: Option<f64>,

    /// Aggregate events on N worker threads
    #[arg(long, value_name = "N", default_value = "1")]
    pub partitions: usize,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Full flame graph payload
    Json,
    /// Collapsed stacks (`a;b;c 42`)
    Folded,
}

impl From<OutputFormat> for ExportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => ExportFormat::Json,
            OutputFormat::Folded => ExportFormat::Folded,
        }
    }
}

impl Args {
    /// Query window from `--start/--end` or `--total-seconds` (zero-length if
    /// neither was given).
    ///
    /// # Errors
    /// `InvalidInput` for reversed or non-finite bounds.
    pub fn window(&self) -> Result<TimeWindow, FlameGraphError> {
        match (self.start, self.end, self.total_seconds) {
            (Some(start), Some(end), _) => TimeWindow::new(start, end),
            (_, _, Some(seconds)) => TimeWindow::from_seconds(seconds),
            _ => TimeWindow::from_seconds(0.0),
        }
    }

    /// True when the input should be read from stdin.
    #[must_use]
    pub fn reads_stdin(&self) -> bool {
        self.input.as_os_str() == "-"
    }
}
