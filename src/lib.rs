//! macOS app bundle relocation library
//!
//! This library makes `.app` bundles self-contained: every non-system dylib
//! and framework reachable from the bundle's executables is copied into the
//! bundle, and every reference to it is rewritten to `@executable_path` form.
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod error;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};
