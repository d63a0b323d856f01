//! Relocation engine.
//!
//! Takes a macOS `.app` bundle whose executables link against libraries and
//! frameworks elsewhere on the build machine, copies the non-system ones into
//! the bundle and rewrites every reference so the bundle runs on a machine
//! without them.
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_relocate::bundler::{Bundler, RunStatus, SettingsBuilder};
//!
//! # async fn example() -> kodegen_bundler_relocate::bundler::Result<()> {
//! let settings = SettingsBuilder::new().bundle_root("MyApp.app").build()?;
//! let max_ratio = settings.max_failure_ratio();
//!
//! let report = Bundler::new(settings).relocate().await?;
//! if report.status(max_ratio) != RunStatus::Success {
//!     eprintln!("{} unresolved references", report.unresolved.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod error;
pub mod platform;
pub mod settings;
pub mod utils;

pub use builder::Bundler;
pub use error::{Context, Error, ErrorExt, Result};
pub use platform::macos::dylib::{
    BundleLayout, InstallNameTool, Inspection, Inspector, LibraryKind, LibraryReference,
    MachOInspector, ObjectKind, ReferenceKind, RelocationReport, Rewriter, RunStatus, ScanReport,
};
pub use settings::{LayoutSettings, RelocateConfig, Settings, SettingsBuilder};
