//! Bundle directory layout settings.

use std::path::PathBuf;

/// Locations of the well-known bundle subdirectories, relative to the bundle root.
///
/// # Configuration
///
/// ```toml
/// [relocate.layout]
/// executables = "Contents/MacOS"
/// frameworks = "Contents/Frameworks"
/// libraries = "Contents/Frameworks"
/// helpers = "Contents/Helpers"
/// ```
///
/// Private libraries default to the frameworks directory, which is where
/// Xcode and most packaging tools place loose dylibs.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Directory holding the main executable(s).
    ///
    /// Default: `Contents/MacOS`
    pub executables: PathBuf,

    /// Directory receiving whole framework trees.
    ///
    /// Default: `Contents/Frameworks`
    pub frameworks: PathBuf,

    /// Directory receiving plain dylibs.
    ///
    /// Default: `Contents/Frameworks`
    pub libraries: PathBuf,

    /// Directory receiving helper executables pulled in as dependencies.
    ///
    /// Default: `Contents/Helpers`
    pub helpers: PathBuf,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            executables: PathBuf::from("Contents/MacOS"),
            frameworks: PathBuf::from("Contents/Frameworks"),
            libraries: PathBuf::from("Contents/Frameworks"),
            helpers: PathBuf::from("Contents/Helpers"),
        }
    }
}
