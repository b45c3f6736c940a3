//! dupsift - concurrent duplicate file finder
//!
//! Finds groups of byte-identical files under a directory tree with a
//! three-stage pipeline (crawler, candidate filter, verifier) connected by
//! bounded channels, and writes one report line per duplicate group.

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod scanner;

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use cli::{Cli, Commands, ExtractArgs, ScanArgs};
use config::{Config, ConfigError, ScanConfig};
use duplicates::{DuplicateFinder, ScanSummary};
use error::ExitCode;
use output::{extract_per_directory, Extractor};
use progress::{LogProgress, Progress, ProgressCallback};

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the root cannot be
/// scanned, the report cannot be written, or a pipeline stage fails.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref());
    log::info!("dupsift {} starting", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Scan(args) => run_scan(args, cli.config.as_deref(), cli.quiet),
        Commands::Extract(args) => run_extract(args, cli.quiet),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load_from_path(path),
        None => Ok(Config::load()),
    }
}

fn run_scan(args: &ScanArgs, config_path: Option<&Path>, quiet: bool) -> anyhow::Result<ExitCode> {
    let mut config = load_config(config_path)?;
    args.apply_to(&mut config);
    if let Some(path) = &args.save_config {
        config
            .save(path)
            .with_context(|| format!("Failed to save config to {}", path.display()))?;
        log::info!("Configuration saved to {}", path.display());
    }
    let scan = ScanConfig::new(&args.root, &args.export, &config)?;

    log::info!(
        "Scanning {} into {} ({}, sniff {}, {:?} verifier)",
        scan.root.display(),
        scan.export.display(),
        scan.algorithm,
        scan.sniff_budget,
        scan.run_mode
    );

    let interactive = !quiet && !args.no_progress && std::io::stderr().is_terminal();
    let progress: Arc<dyn ProgressCallback> = if interactive {
        Arc::new(Progress::with_accessible(args.accessible))
    } else {
        Arc::new(LogProgress::new(scan.progress_interval))
    };

    let summary = DuplicateFinder::new(scan)
        .with_progress_callback(progress)
        .run()
        .context("Scan failed")?;

    if !quiet {
        print_summary(&summary, &args.export);
    }
    Ok(ExitCode::from_summary(&summary))
}

fn print_summary(summary: &ScanSummary, export: &Path) {
    println!(
        "Scanned {} files in {:.2?}",
        summary.crawl.visited, summary.scan_duration
    );
    println!(
        "{} duplicate groups ({} files, {} reclaimable) written to {}",
        summary.duplicate_groups(),
        summary.duplicate_files(),
        summary.reclaimable_display(),
        export.display()
    );
    if summary.crawl.temp_deleted > 0 {
        println!("{} temporary files deleted", summary.crawl.temp_deleted);
    }
    if summary.skipped_files() > 0 {
        println!(
            "{} files skipped because of errors (see log)",
            summary.skipped_files()
        );
    }
}

fn run_extract(args: &ExtractArgs, quiet: bool) -> anyhow::Result<ExitCode> {
    let lines = if args.directory {
        let results = extract_per_directory(
            Path::new(&args.target),
            &args.input,
            &args.export,
            &args.split_symbol,
            &args.strip_prefix,
        )?;
        if !quiet {
            for (path, lines) in &results {
                println!("{}: {} lines", path.display(), lines);
            }
        }
        results.iter().map(|(_, lines)| lines).sum::<usize>()
    } else {
        let lines = Extractor::new(args.target.as_str(), args.split_symbol.as_str())
            .extract_file(&args.input, &args.export)?;
        if !quiet {
            println!("{}: {} lines", args.export.display(), lines);
        }
        lines
    };

    Ok(if lines > 0 {
        ExitCode::Success
    } else {
        ExitCode::NoDuplicates
    })
}
