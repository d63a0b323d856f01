//! Main relocation orchestration.
//!
//! This module provides the [`Bundler`] orchestrator that prepares the bundle
//! layout, discovers the executable roots and drives the traversal.

use crate::bundler::{
    Result, Settings,
    platform::macos::dylib::{
        BundleLayout, InstallNameTool, Inspector, MachOInspector, RelocationReport, Rewriter,
        ScanReport, Traversal, discover_roots, scan,
    },
};

/// Main relocation orchestrator.
///
/// Generic over the two external capabilities so tests can substitute a
/// scripted inspector and rewriter.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_relocate::bundler::{Bundler, SettingsBuilder};
///
/// # async fn example() -> kodegen_bundler_relocate::bundler::Result<()> {
/// let settings = SettingsBuilder::new().bundle_root("MyApp.app").build()?;
/// let bundler = Bundler::new(settings);
///
/// let report = bundler.relocate().await?;
/// println!("Copied {} libraries", report.copies.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Bundler<I = MachOInspector, R = InstallNameTool> {
    settings: Settings,
    inspector: I,
    rewriter: R,
}

impl Bundler {
    /// Creates a bundler using goblin for inspection and `install_name_tool`
    /// for rewriting.
    pub fn new(settings: Settings) -> Self {
        let rewriter = InstallNameTool::new(settings.tool_timeout());
        Self {
            settings,
            inspector: MachOInspector,
            rewriter,
        }
    }
}

impl<I: Inspector, R: Rewriter> Bundler<I, R> {
    /// Creates a bundler with explicit capabilities.
    pub fn with_tools(settings: Settings, inspector: I, rewriter: R) -> Self {
        Self {
            settings,
            inspector,
            rewriter,
        }
    }

    /// Settings this bundler runs with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Makes the bundle self-contained.
    ///
    /// Creates the private directories, then visits every executable in the
    /// bundle. Recoverable failures end up in the returned report.
    ///
    /// # Errors
    ///
    /// Only fatal preconditions: a missing bundle root, or a layout that
    /// cannot be created or walked.
    pub async fn relocate(&self) -> Result<RelocationReport> {
        let layout = BundleLayout::prepare(&self.settings).await?;
        let roots = discover_roots(&layout)?;
        log::info!(
            "Relocating {} ({} executables)",
            layout.root().display(),
            roots.len()
        );

        let report = Traversal::new(&self.settings, &layout, &self.inspector, &self.rewriter)
            .run(roots)
            .await;
        report.log_summary();
        Ok(report)
    }

    /// Lists the external libraries the bundle needs without changing anything.
    pub fn scan(&self) -> Result<ScanReport> {
        let layout = BundleLayout::open(&self.settings)?;
        scan(&self.settings, &layout, &self.inspector)
    }
}
