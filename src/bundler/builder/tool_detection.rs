//! External tool detection.
//!
//! Lookups are cached so a run with thousands of rewrites searches `PATH` once.

use std::path::PathBuf;
use std::sync::LazyLock;

/// Location of `install_name_tool`, if it is on `PATH`.
pub static INSTALL_NAME_TOOL: LazyLock<Option<PathBuf>> =
    LazyLock::new(|| match which::which("install_name_tool") {
        Ok(path) => {
            log::debug!("Found install_name_tool at: {}", path.display());
            Some(path)
        }
        Err(e) => {
            log::debug!(
                "install_name_tool not found in PATH: {}. Rewrites will fail until it is installed.",
                e
            );
            None
        }
    });
