//! Relocation orchestration.
//!
//! This module provides the main [`Bundler`] orchestrator that prepares a
//! bundle and runs the dependency traversal over it.
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_relocate::bundler::{Bundler, SettingsBuilder};
//!
//! # async fn example() -> kodegen_bundler_relocate::bundler::Result<()> {
//! let settings = SettingsBuilder::new()
//!     .bundle_root("target/release/MyApp.app")
//!     .build()?;
//!
//! let report = Bundler::new(settings).relocate().await?;
//! for copy in &report.copies {
//!     println!("Bundled: {} -> {}", copy.source.display(), copy.destination.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`orchestrator`] - Main [`Bundler`] struct
//! - [`tool_detection`] - Cached lookup of external tools

mod orchestrator;
pub(crate) mod tool_detection;

pub use orchestrator::Bundler;
