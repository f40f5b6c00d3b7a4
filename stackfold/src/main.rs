//! # stackfold - Main Entry Point
//!
//! Reads a fetch result document, runs the flame graph pipeline and writes the
//! result as JSON or folded stacks.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};

use stackfold::cli::Args;
use stackfold::domain::FlameGraphError;
use stackfold::export::export;
use stackfold::fetch::FetchResult;
use stackfold::pipeline::Pipeline;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_DATAERR: i32 = 65;

/// Context attached to time window errors; `exit_code_for` maps it to usage.
const INVALID_WINDOW: &str = "Invalid time window";

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.to_string() == INVALID_WINDOW {
        EXIT_USAGE
    } else if err.downcast_ref::<FlameGraphError>().is_some() {
        EXIT_DATAERR
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let window = args.window().context(INVALID_WINDOW)?;

    let fetch = if args.reads_stdin() {
        FetchResult::from_reader(io::stdin().lock())?
    } else {
        FetchResult::from_file(&args.input)?
    };

    let pipeline = Pipeline::default().with_partitions(args.partitions);
    let graph = pipeline.run_fetch(fetch, window)?;

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            export(&graph, args.format.into(), args.pretty, &mut writer)?;
            writer.flush()?;
            if !args.quiet {
                println!(
                    "Wrote {} nodes ({} sampled, ~{} estimated traces) to {}",
                    graph.size,
                    graph.sampled_traces,
                    graph.total_traces,
                    path.display()
                );
            }
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            export(&graph, args.format.into(), args.pretty, &mut writer)?;
            writer.flush()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackfold::domain::TimeWindow;

    #[test]
    fn test_exit_code_for_invalid_window() {
        let err = TimeWindow::new(10.0, 5.0).context(INVALID_WINDOW).unwrap_err();
        assert_eq!(exit_code_for(&err), EXIT_USAGE);
    }

    #[test]
    fn test_exit_code_for_invalid_data() {
        let err = anyhow::Error::new(FlameGraphError::InvalidInput("zero count".into()));
        assert_eq!(exit_code_for(&err), EXIT_DATAERR);
    }

    #[test]
    fn test_exit_code_for_invalid_data_with_context() {
        let err = Err::<(), _>(FlameGraphError::InvalidInput("zero count".into()))
            .context("Failed to build flame graph")
            .unwrap_err();
        assert_eq!(exit_code_for(&err), EXIT_DATAERR);
    }

    #[test]
    fn test_exit_code_for_other_errors() {
        let err = anyhow::anyhow!("Failed to read fetch result in.json");
        assert_eq!(exit_code_for(&err), EXIT_ERROR);
    }
}
