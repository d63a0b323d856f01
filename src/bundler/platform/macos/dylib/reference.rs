//! Classification of raw load-command references.
//!
//! A binary names each dependency with a string such as
//! `/opt/homebrew/lib/libpng16.16.dylib`, `@rpath/QtCore.framework/Versions/5/QtCore`
//! or `@executable_path/../Frameworks/libfoo.dylib`. [`classify`] maps that
//! string to exactly one [`ReferenceKind`] without touching the filesystem.

use serde::Serialize;

/// Placeholder expanded through the consuming binary's `LC_RPATH` entries.
pub const RPATH_TOKEN: &str = "@rpath";

/// Placeholder expanded to the directory of the binary holding the reference.
pub const LOADER_PATH_TOKEN: &str = "@loader_path";

/// Placeholder expanded to the directory of the main executable.
pub const EXECUTABLE_PATH_TOKEN: &str = "@executable_path";

/// Path segment suffix identifying a framework bundle directory.
pub const FRAMEWORK_SUFFIX: &str = ".framework";

/// How a reference must be resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    /// Owned by the OS; never resolved, copied or rewritten.
    System,
    /// Starts with `@rpath/` or `@loader_path/`.
    RuntimeSearchPathRelative,
    /// Names a binary inside a `.framework` directory.
    FrameworkRelative,
    /// A literal path outside the bundle.
    Absolute,
    /// Already expressed relative to the bundle's executable.
    AlreadyBundled,
}

/// One dependency reference read from a binary, with its classification.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LibraryReference {
    raw: String,
    kind: ReferenceKind,
}

impl LibraryReference {
    /// Classifies `raw` against the given system prefixes.
    pub fn classify(raw: impl Into<String>, system_prefixes: &[String]) -> Self {
        let raw = raw.into();
        let kind = classify(&raw, system_prefixes);
        Self { raw, kind }
    }

    /// The reference exactly as stored in the binary.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The derived classification.
    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    /// Last path segment of the reference.
    pub fn file_name(&self) -> &str {
        self.raw.rsplit('/').next().unwrap_or(&self.raw)
    }

    /// Portion of the reference starting at the framework directory,
    /// e.g. `QtCore.framework/Versions/5/QtCore`.
    pub fn framework_suffix(&self) -> Option<&str> {
        let (root, _) = split_framework(&self.raw)?;
        let start = root.rfind('/').map_or(0, |i| i + 1);
        Some(&self.raw[start..])
    }
}

/// Classifies a raw reference string.
///
/// Checks run in a fixed order so every string lands in exactly one class:
/// system prefixes, `@executable_path`, runtime placeholders, framework marker,
/// and finally literal paths.
pub fn classify(raw: &str, system_prefixes: &[String]) -> ReferenceKind {
    if system_prefixes.iter().any(|p| raw.starts_with(p.as_str())) {
        ReferenceKind::System
    } else if has_token(raw, EXECUTABLE_PATH_TOKEN) {
        ReferenceKind::AlreadyBundled
    } else if has_token(raw, RPATH_TOKEN) || has_token(raw, LOADER_PATH_TOKEN) {
        ReferenceKind::RuntimeSearchPathRelative
    } else if split_framework(raw).is_some() {
        ReferenceKind::FrameworkRelative
    } else {
        ReferenceKind::Absolute
    }
}

/// Returns the remainder of `raw` after `token/`, if `raw` starts with it.
pub fn strip_token<'a>(raw: &'a str, token: &str) -> Option<&'a str> {
    raw.strip_prefix(token)?.strip_prefix('/')
}

fn has_token(raw: &str, token: &str) -> bool {
    strip_token(raw, token).is_some()
}

/// Splits a path at its innermost `.framework` directory.
///
/// `/Library/Frameworks/Foo.framework/Versions/A/Foo` becomes
/// `("/Library/Frameworks/Foo.framework", "Versions/A/Foo")`.
pub fn split_framework(path: &str) -> Option<(&str, &str)> {
    let marker = format!("{FRAMEWORK_SUFFIX}/");
    let idx = path.rfind(&marker)?;
    let root_end = idx + FRAMEWORK_SUFFIX.len();
    let subpath = &path[root_end + 1..];
    if subpath.is_empty() {
        return None;
    }
    Some((&path[..root_end], subpath))
}
