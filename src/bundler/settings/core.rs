//! Core Settings struct and implementations.

use super::LayoutSettings;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fallback library directories of the common package managers, searched in order.
pub const DEFAULT_SEARCH_DIRS: &[&str] = &["/usr/local/lib", "/opt/homebrew/lib", "/opt/local/lib"];

/// Reference prefixes owned by macOS itself.
pub const DEFAULT_SYSTEM_PREFIXES: &[&str] = &["/usr/lib/", "/System/"];

/// Default fraction of failed operations tolerated before a run is failed.
pub const DEFAULT_MAX_FAILURE_RATIO: f64 = 0.25;

/// Default time budget for a single external tool invocation.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Main settings for relocation operations.
///
/// Constructed via [`SettingsBuilder`](super::SettingsBuilder).
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_relocate::bundler::SettingsBuilder;
///
/// # fn example() -> kodegen_bundler_relocate::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .bundle_root("target/release/bundle/macos/MyApp.app")
///     .search_dirs(vec!["/opt/homebrew/lib".into()])
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Settings {
    /// Root of the `.app` bundle.
    bundle_root: PathBuf,

    /// Bundle subdirectory layout.
    layout: LayoutSettings,

    /// Fallback search directories for unresolved library names.
    search_dirs: Vec<PathBuf>,

    /// Reference prefixes treated as system libraries.
    system_prefixes: Vec<String>,

    /// Failure ratio above which the run fails.
    max_failure_ratio: f64,

    /// External tool timeout.
    tool_timeout: Duration,
}

impl Settings {
    /// Returns the bundle root as configured (not yet canonicalized).
    pub fn bundle_root(&self) -> &Path {
        &self.bundle_root
    }

    /// Returns the bundle layout.
    pub fn layout(&self) -> &LayoutSettings {
        &self.layout
    }

    /// Returns the fallback search directories, in search order.
    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Returns the system reference prefixes.
    pub fn system_prefixes(&self) -> &[String] {
        &self.system_prefixes
    }

    /// Returns the tolerated failure ratio.
    pub fn max_failure_ratio(&self) -> f64 {
        self.max_failure_ratio
    }

    /// Returns the external tool timeout.
    pub fn tool_timeout(&self) -> Duration {
        self.tool_timeout
    }

    /// Creates a new Settings instance (used by SettingsBuilder).
    pub(super) fn new(
        bundle_root: PathBuf,
        layout: LayoutSettings,
        search_dirs: Vec<PathBuf>,
        system_prefixes: Vec<String>,
        max_failure_ratio: f64,
        tool_timeout: Duration,
    ) -> Self {
        Self {
            bundle_root,
            layout,
            search_dirs,
            system_prefixes,
            max_failure_ratio,
            tool_timeout,
        }
    }
}
