//! Configuration structures for relocation.
//!
//! Settings are assembled by [`SettingsBuilder`] from command line flags, an
//! optional TOML file ([`RelocateConfig`]) and built-in defaults.

mod builder;
mod config;
mod core;
mod layout;

pub use builder::SettingsBuilder;
pub use config::RelocateConfig;
pub use self::core::{
    DEFAULT_MAX_FAILURE_RATIO, DEFAULT_SEARCH_DIRS, DEFAULT_SYSTEM_PREFIXES, DEFAULT_TOOL_TIMEOUT,
    Settings,
};
pub use layout::LayoutSettings;
