//! `comment_probe`: reports the comment count of community request pages as JSON.
//!
//! ```bash
//! comment_probe 123456-some-request
//! comment_probe --config probe.ron --minimal 123456-a 654321-b
//! comment_probe --print-default-config > probe.ron
//! ```

mod config_file;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use futures_util::future::join_all;
use probe_engine::Pipeline;
use probe_logging::{level_from_verbosity, probe_info, LogDestination};

#[derive(Debug, Parser)]
#[command(name = "comment_probe")]
#[command(about = "Count the comments on community request pages")]
#[command(version)]
struct Cli {
    /// Pipeline configuration in RON. Built-in defaults are used when omitted.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Print only the identifier, count and found flag.
    #[arg(long)]
    minimal: bool,

    /// Pretty-print JSON output.
    #[arg(long)]
    pretty: bool,

    /// Log more to stderr (-v info, -vv debug, -vvv trace).
    #[arg(long, short, action = ArgAction::Count)]
    verbose: u8,

    /// Also write the log to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the built-in configuration as RON and exit.
    #[arg(long)]
    print_default_config: bool,

    /// Request identifiers, e.g. `123456-some-request`.
    #[arg(required_unless_present = "print_default_config")]
    identifiers: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let destination = match cli.log_file.as_deref() {
        Some(path) => LogDestination::Both(path),
        None => LogDestination::Terminal,
    };
    if !probe_logging::initialize(destination, level_from_verbosity(cli.verbose)) {
        eprintln!("comment_probe: logging could not be initialized");
    }

    if cli.print_default_config {
        println!("{}", config_file::default_config_ron()?);
        return Ok(ExitCode::SUCCESS);
    }

    let config = config_file::load(cli.config.as_deref())?;
    let pipeline = Pipeline::from_config(&config).context("invalid pipeline configuration")?;
    probe_info!(
        "backends: {}; strategies: {}",
        pipeline.retrieval().backend_names().join(" -> "),
        pipeline.extraction().strategy_names().join(" -> ")
    );

    let outcomes = join_all(
        cli.identifiers
            .iter()
            .map(|identifier| pipeline.run(identifier)),
    )
    .await;

    let mut all_found = true;
    for outcome in &outcomes {
        all_found &= outcome.is_found();
        println!("{}", output::render(outcome, cli.minimal, cli.pretty)?);
    }

    Ok(if all_found {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
