//! Kodegen Bundler Relocate - makes macOS app bundles self-contained.
//!
//! This binary copies non-system libraries and frameworks into an .app bundle
//! and rewrites their install names, exiting 0, 2 or 1 for full success,
//! partial success and failure.

use kodegen_bundler_relocate::cli;
use std::process;

#[tokio::main]
async fn main() {
    // Run CLI and get exit code
    let exit_code = match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    process::exit(exit_code);
}
