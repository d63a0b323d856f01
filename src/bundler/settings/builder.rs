//! Builder for constructing Settings.

use super::core::{
    DEFAULT_MAX_FAILURE_RATIO, DEFAULT_SEARCH_DIRS, DEFAULT_SYSTEM_PREFIXES, DEFAULT_TOOL_TIMEOUT,
};
use super::{LayoutSettings, RelocateConfig, Settings};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Builder for constructing [`Settings`].
///
/// Unset fields fall back to the `DEFAULT_*` constants.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_relocate::bundler::{SettingsBuilder, RelocateConfig};
/// use std::time::Duration;
///
/// # fn example() -> kodegen_bundler_relocate::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .bundle_root("MyApp.app")
///     .apply_config(RelocateConfig::default())
///     .tool_timeout(Duration::from_secs(10))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
    bundle_root: Option<PathBuf>,
    layout: Option<LayoutSettings>,
    search_dirs: Option<Vec<PathBuf>>,
    system_prefixes: Option<Vec<String>>,
    max_failure_ratio: Option<f64>,
    tool_timeout: Option<Duration>,
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the bundle root.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn bundle_root<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.bundle_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the bundle layout.
    pub fn layout(mut self, layout: LayoutSettings) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Sets the fallback search directories.
    pub fn search_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_dirs = Some(dirs);
        self
    }

    /// Sets the system reference prefixes.
    pub fn system_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.system_prefixes = Some(prefixes);
        self
    }

    /// Sets the tolerated failure ratio.
    pub fn max_failure_ratio(mut self, ratio: f64) -> Self {
        self.max_failure_ratio = Some(ratio);
        self
    }

    /// Sets the external tool timeout.
    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    /// Fills every field not already set from a config file.
    pub fn apply_config(mut self, config: RelocateConfig) -> Self {
        if self.layout.is_none() {
            self.layout = config.layout;
        }
        if self.search_dirs.is_none() {
            self.search_dirs = config.search_dirs;
        }
        if self.system_prefixes.is_none() {
            self.system_prefixes = config.system_prefixes;
        }
        if self.max_failure_ratio.is_none() {
            self.max_failure_ratio = config.max_failure_ratio;
        }
        if self.tool_timeout.is_none() {
            self.tool_timeout = config.tool_timeout_secs.map(Duration::from_secs);
        }
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if `bundle_root` is missing or the failure ratio is
    /// outside `0.0..=1.0`.
    pub fn build(self) -> crate::bundler::Result<Settings> {
        use crate::bundler::error::Context;

        let max_failure_ratio = self.max_failure_ratio.unwrap_or(DEFAULT_MAX_FAILURE_RATIO);
        if !(0.0..=1.0).contains(&max_failure_ratio) {
            crate::bail!("max_failure_ratio must be within 0.0..=1.0, got {max_failure_ratio}");
        }

        Ok(Settings::new(
            self.bundle_root.context("bundle_root is required")?,
            self.layout.unwrap_or_default(),
            self.search_dirs
                .unwrap_or_else(|| DEFAULT_SEARCH_DIRS.iter().map(PathBuf::from).collect()),
            self.system_prefixes.unwrap_or_else(|| {
                DEFAULT_SYSTEM_PREFIXES
                    .iter()
                    .map(|p| p.to_string())
                    .collect()
            }),
            max_failure_ratio,
            self.tool_timeout.unwrap_or(DEFAULT_TOOL_TIMEOUT),
        ))
    }
}
