//! Optional TOML configuration file.

use super::LayoutSettings;
use crate::bundler::error::{ErrorExt, Result};
use std::path::{Path, PathBuf};

/// Relocation settings read from a TOML file.
///
/// Every field is optional; unset fields fall back to built-in defaults and
/// command line flags take precedence over anything set here.
///
/// # Configuration
///
/// ```toml
/// [relocate]
/// search_dirs = ["/opt/homebrew/lib", "/usr/local/lib"]
/// system_prefixes = ["/usr/lib/", "/System/"]
/// max_failure_ratio = 0.1
/// tool_timeout_secs = 30
///
/// [relocate.layout]
/// libraries = "Contents/Libraries"
/// ```
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct RelocateConfig {
    /// Bundle layout overrides.
    #[serde(default)]
    pub layout: Option<LayoutSettings>,

    /// Fallback directories searched for libraries that are not found literally.
    #[serde(default)]
    pub search_dirs: Option<Vec<PathBuf>>,

    /// Reference prefixes owned by the OS; never copied or rewritten.
    #[serde(default)]
    pub system_prefixes: Option<Vec<String>>,

    /// Fraction of failed operations above which the run is reported as failed.
    #[serde(default)]
    pub max_failure_ratio: Option<f64>,

    /// Time budget for each external tool invocation, in seconds.
    #[serde(default)]
    pub tool_timeout_secs: Option<u64>,
}

#[derive(serde::Deserialize)]
struct ConfigFile {
    #[serde(default)]
    relocate: RelocateConfig,
}

impl RelocateConfig {
    /// Loads the `[relocate]` table from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).fs_context("failed to read config file", path)?;
        Self::from_toml(&contents)
    }

    /// Parses the `[relocate]` table from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)?;
        Ok(file.relocate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_config() {
        let config = RelocateConfig::from_toml(
            r#"
            [relocate]
            search_dirs = ["/opt/custom/lib"]
            max_failure_ratio = 0.5

            [relocate.layout]
            libraries = "Contents/Libraries"
            "#,
        )
        .unwrap();

        assert_eq!(config.search_dirs, Some(vec![PathBuf::from("/opt/custom/lib")]));
        assert_eq!(config.max_failure_ratio, Some(0.5));
        let layout = config.layout.unwrap();
        assert_eq!(layout.libraries, PathBuf::from("Contents/Libraries"));
        assert_eq!(layout.frameworks, PathBuf::from("Contents/Frameworks"));
        assert!(config.system_prefixes.is_none());
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config = RelocateConfig::from_toml("").unwrap();
        assert!(config.layout.is_none());
        assert!(config.tool_timeout_secs.is_none());
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(RelocateConfig::from_toml("[relocate\nsearch_dirs = 1").is_err());
    }
}
