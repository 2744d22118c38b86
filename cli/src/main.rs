//! `radar-embed` entry point.
//!
//! Parses arguments, runs one export with the built-in thumbnail embedder,
//! and prints a single summary line. Failures print one `Error:` line to
//! stderr and exit with status 1.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use radar_embeddings::{ExportSummary, Exporter, ImageCrateLoader, ThumbnailEmbedder};
use tracing_subscriber::EnvFilter;

use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v/-q. Logs go to stderr; stdout carries the summary.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(summary) => {
            println!(
                "Saved {} embeddings to {}",
                summary.rows,
                summary.matrix_path.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<ExportSummary> {
    let config = cli.export_config()?;
    let embedder = ThumbnailEmbedder::new(&config.device).with_grid(cli.grid)?;
    let exporter = Exporter::new(config, &ImageCrateLoader, &embedder);

    let bar = if cli.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    bar.set_style(
        ProgressStyle::with_template("Embedding {bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let summary = exporter.run_with_progress(&mut |done, total| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    });
    bar.finish_and_clear();

    Ok(summary?)
}
