//! Command line argument parsing and validation.
//!
//! This module provides CLI argument parsing using clap, with validation of
//! values clap cannot check on its own.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Makes macOS app bundles self-contained
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_bundler_relocate",
    version,
    about = "Makes macOS app bundles self-contained",
    long_about = "Copies every non-system dylib and framework an .app bundle links against into the bundle and rewrites the references to @executable_path form.

Usage:
  kodegen_bundler_relocate relocate target/release/MyApp.app
  kodegen_bundler_relocate relocate MyApp.app --search-dir /opt/qt/lib --report report.json
  kodegen_bundler_relocate scan MyApp.app

Exit codes: 0 = fully relocated, 2 = finished with unresolved references or tolerated failures, 1 = error."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Audit log written alongside stderr
    #[arg(long, value_name = "PATH", global = true, default_value = "relocation.log")]
    pub log_file: PathBuf,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Copy dependencies into the bundle and rewrite references
    Relocate(RelocateArgs),

    /// List the libraries a bundle would pull in, without changing it
    Scan(BundleArgs),
}

/// Arguments shared by every subcommand.
#[derive(ClapArgs, Debug)]
pub struct BundleArgs {
    /// Path to the .app bundle
    #[arg(value_name = "BUNDLE")]
    pub bundle: PathBuf,

    /// TOML file with a [relocate] table
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Fallback directory searched for unresolvable references (repeatable)
    #[arg(long = "search-dir", value_name = "DIR")]
    pub search_dirs: Vec<PathBuf>,
}

/// Arguments of `relocate`.
#[derive(ClapArgs, Debug)]
pub struct RelocateArgs {
    #[command(flatten)]
    pub bundle: BundleArgs,

    /// Fraction of failed operations tolerated before the run counts as failed
    #[arg(long, value_name = "RATIO")]
    pub max_failure_ratio: Option<f64>,

    /// Seconds allowed per install_name_tool invocation
    #[arg(long, value_name = "SECS")]
    pub tool_timeout: Option<u64>,

    /// Write the run report as JSON
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if let Command::Relocate(relocate) = &self.command {
            if let Some(ratio) = relocate
                .max_failure_ratio
                .filter(|ratio| !(0.0..=1.0).contains(ratio))
            {
                return Err(format!(
                    "--max-failure-ratio must be between 0 and 1, got {ratio}"
                ));
            }
            if relocate.tool_timeout == Some(0) {
                return Err("--tool-timeout must be at least 1 second".to_string());
            }
        }
        Ok(())
    }

    /// Arguments identifying the bundle, whichever subcommand was chosen.
    pub fn bundle_args(&self) -> &BundleArgs {
        match &self.command {
            Command::Relocate(relocate) => &relocate.bundle,
            Command::Scan(bundle) => bundle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relocate_flags_parse() {
        let args = Args::try_parse_from([
            "kodegen_bundler_relocate",
            "relocate",
            "Demo.app",
            "--search-dir",
            "/opt/a",
            "--search-dir",
            "/opt/b",
            "--max-failure-ratio",
            "0.5",
            "--report",
            "out.json",
            "-v",
        ])
        .unwrap();

        assert!(args.verbose);
        assert_eq!(args.log_file, PathBuf::from("relocation.log"));
        match &args.command {
            Command::Relocate(relocate) => {
                assert_eq!(relocate.bundle.bundle, PathBuf::from("Demo.app"));
                assert_eq!(
                    relocate.bundle.search_dirs,
                    vec![PathBuf::from("/opt/a"), PathBuf::from("/opt/b")]
                );
                assert_eq!(relocate.max_failure_ratio, Some(0.5));
                assert_eq!(relocate.report, Some(PathBuf::from("out.json")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(args.validate().is_ok());
    }

    #[test]
    fn ratio_outside_unit_interval_is_rejected() {
        let args = Args::try_parse_from([
            "kodegen_bundler_relocate",
            "relocate",
            "Demo.app",
            "--max-failure-ratio",
            "2",
        ])
        .unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn scan_takes_a_bundle() {
        let args =
            Args::try_parse_from(["kodegen_bundler_relocate", "scan", "Demo.app"]).unwrap();
        assert_eq!(args.bundle_args().bundle, PathBuf::from("Demo.app"));
    }
}
