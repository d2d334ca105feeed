use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use sheetpress::feed::build_client;
use sheetpress::writer::WriteStatus;
use sheetpress::{Config, Pipeline, RunOptions, RunReport};

#[derive(Parser, Debug)]
#[command(
    name = "sheetpress",
    about = "Build the site content document from published spreadsheet tabs"
)]
struct Args {
    /// Configuration file naming the feed URLs
    #[arg(long, value_name = "FILE", env = "SHEETPRESS_CONFIG", default_value = "sheetpress.toml")]
    config: PathBuf,

    /// Artifact destination (overrides `output` in the config file)
    #[arg(long, value_name = "FILE", env = "SHEETPRESS_OUTPUT")]
    output: Option<PathBuf>,

    /// Fetch and validate every feed without writing the artifact
    #[arg(long)]
    dry_run: bool,
}

fn print_summary(report: &RunReport) {
    for feed in &report.feeds {
        if feed.skipped > 0 {
            println!("  {:<16} {:>3} rows ({} skipped)", feed.kind.name(), feed.rows, feed.skipped);
        } else {
            println!("  {:<16} {:>3} rows", feed.kind.name(), feed.rows);
        }
    }

    match &report.write {
        Some(outcome) if outcome.status == WriteStatus::Written => {
            println!("Wrote {} ({} bytes)", outcome.path.display(), outcome.bytes);
        }
        Some(outcome) => println!("{} is already up to date", outcome.path.display()),
        None => println!(
            "Dry run: {} services validated, nothing written",
            report.document.services.len()
        ),
    }

    if report.warnings() > 0 {
        eprintln!("Warning: {} rows were skipped; see log for details", report.warnings());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::load(&args.config, args.output)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let client = build_client().context("Failed to build HTTP client")?;

    let report = Pipeline::new(config, client)
        .run(RunOptions {
            dry_run: args.dry_run,
        })
        .await
        .context("Content update aborted; the previous artifact was left unchanged")?;

    print_summary(&report);
    Ok(())
}
