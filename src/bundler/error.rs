//! Error types for relocation operations.
//!
//! Per-node and per-edge failures (`Inspection`, `UnresolvedDependency`,
//! `Materialization`, `Rewrite`) are recorded by the traversal and never abort
//! a run. `BundleRootMissing` is the one fatal precondition.

use std::{
    fmt::Display,
    io,
    path::{PathBuf, StripPrefixError},
    time::Duration,
};

/// Result type alias for relocation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the relocation engine.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Free-form error with a message.
    #[error("{0}")]
    GenericError(String),

    /// Bare I/O error.
    #[error(transparent)]
    IoError(#[from] io::Error),

    /// I/O error with the operation and path that triggered it.
    #[error("{context} {}: {error}", .path.display())]
    Fs {
        /// What was being attempted.
        context: &'static str,
        /// Path the operation acted on.
        path: PathBuf,
        /// Underlying error.
        #[source]
        error: io::Error,
    },

    /// Directory walk failure.
    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),

    /// Path prefix stripping failure.
    #[error(transparent)]
    StripPrefix(#[from] StripPrefixError),

    /// Mach-O parsing failure reported by goblin.
    #[error(transparent)]
    Goblin(#[from] goblin::error::Error),

    /// Info.plist parsing failure.
    #[error(transparent)]
    Plist(#[from] plist::Error),

    /// Invalid glob pattern.
    #[error(transparent)]
    Glob(#[from] glob::PatternError),

    /// Invalid regular expression.
    #[error(transparent)]
    Regex(#[from] regex::Error),

    /// Invalid TOML configuration.
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// The binary inspector could not be run or produced unusable output.
    #[error("failed to inspect {}: {reason}", .path.display())]
    Inspection {
        /// Binary being inspected.
        path: PathBuf,
        /// Why inspection failed.
        reason: String,
    },

    /// A dependency reference did not map to any existing file.
    #[error("unresolved dependency `{reference}` of {}", .binary.display())]
    UnresolvedDependency {
        /// Consuming binary.
        binary: PathBuf,
        /// Raw reference string as stored in the binary.
        reference: String,
    },

    /// Copying a dependency into the bundle failed.
    #[error("failed to copy {} to {}: {reason}", .origin.display(), .destination.display())]
    Materialization {
        /// Canonical source path.
        origin: PathBuf,
        /// Attempted destination inside the bundle.
        destination: PathBuf,
        /// Why the copy failed.
        reason: String,
    },

    /// The link editor rejected a reference or identity rewrite.
    #[error("failed to rewrite {}: `{old}` -> `{new}`: {reason}", .binary.display())]
    Rewrite {
        /// Binary being patched.
        binary: PathBuf,
        /// Reference (or identity) before the rewrite.
        old: String,
        /// Requested replacement.
        new: String,
        /// Tool diagnostics.
        reason: String,
    },

    /// An external tool exceeded its time budget and was killed.
    #[error("{tool} timed out after {timeout:?}")]
    ToolTimeout {
        /// Tool name.
        tool: String,
        /// Budget that was exceeded.
        timeout: Duration,
    },

    /// The bundle root is missing or not a directory.
    #[error("bundle root {} does not exist or is not a directory", .0.display())]
    BundleRootMissing(PathBuf),
}

/// Attaches a human readable message to a failure.
pub trait Context<T> {
    /// Wraps the error (or `None`) with a static message.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Wraps the error (or `None`) with a lazily built message.
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E: std::error::Error> Context<T> for std::result::Result<T, E> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::GenericError(format!("{context}: {e}")))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::GenericError(format!("{}: {e}", f())))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Adds filesystem context to I/O results.
pub trait ErrorExt<T> {
    /// Wraps an `io::Error` with the operation and path it belongs to.
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Returns early with a [`Error::GenericError`].
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::bundler::Error::GenericError(format!($msg)))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($fmt, $($arg)*)))
    };
}
