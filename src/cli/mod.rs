//! Command line interface for the relocation engine.
//!
//! This module parses arguments, sets up logging, assembles [`Settings`]
//! from flags, config file and defaults, and maps the run outcome to an exit
//! code.

mod args;
mod logging;

pub use args::{Args, BundleArgs, Command, RelocateArgs};

use crate::bundler::{Bundler, RelocateConfig, RunStatus, Settings, SettingsBuilder};
use crate::error::{CliError, Result};
use path_absolutize::Absolutize;
use std::time::Duration;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;

    let level = if args.verbose {
        logging::Level::Verbose
    } else {
        logging::Level::Default
    };
    logging::setup_logging(level, &args.log_file)?;

    let settings = build_settings(&args)?;
    match &args.command {
        Command::Relocate(relocate) => relocate_bundle(settings, relocate).await,
        Command::Scan(_) => scan_bundle(settings),
    }
}

/// Builds settings with CLI flags taking precedence over the config file.
pub fn build_settings(args: &Args) -> Result<Settings> {
    let bundle = args.bundle_args();
    let root = bundle.bundle.absolutize()?.into_owned();

    let mut builder = SettingsBuilder::new().bundle_root(root);
    if !bundle.search_dirs.is_empty() {
        builder = builder.search_dirs(bundle.search_dirs.clone());
    }
    if let Command::Relocate(relocate) = &args.command {
        if let Some(ratio) = relocate.max_failure_ratio {
            builder = builder.max_failure_ratio(ratio);
        }
        if let Some(secs) = relocate.tool_timeout {
            builder = builder.tool_timeout(Duration::from_secs(secs));
        }
    }
    if let Some(path) = &bundle.config {
        log::debug!("Loading config from {}", path.display());
        builder = builder.apply_config(RelocateConfig::load(path)?);
    }

    Ok(builder.build()?)
}

async fn relocate_bundle(settings: Settings, args: &RelocateArgs) -> Result<i32> {
    let max_ratio = settings.max_failure_ratio();
    let report = Bundler::new(settings).relocate().await?;

    if let Some(path) = &args.report {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        log::info!("Report written to {}", path.display());
    }

    let status = report.status(max_ratio);
    match status {
        RunStatus::Success => log::info!("Bundle is self-contained"),
        RunStatus::Partial => log::warn!(
            "Finished with {} unresolved references and {} failures",
            report.unresolved.len(),
            report.failures.len()
        ),
        RunStatus::Failed => log::error!(
            "Failure ratio {:.2} exceeds the allowed {:.2}",
            report.failure_ratio(),
            max_ratio
        ),
    }
    Ok(status.exit_code())
}

fn scan_bundle(settings: Settings) -> Result<i32> {
    let report = Bundler::new(settings).scan()?;

    println!("Libraries to bundle:");
    for (source, references) in &report.libraries {
        println!("  {}", source.display());
        for reference in references {
            println!("      as {reference}");
        }
    }
    if report.unresolved.is_empty() {
        return Ok(0);
    }

    println!("Unresolved:");
    for unresolved in &report.unresolved {
        println!(
            "  {} (needed by {})",
            unresolved.reference,
            unresolved.binary.display()
        );
    }
    Ok(RunStatus::Partial.exit_code())
}
