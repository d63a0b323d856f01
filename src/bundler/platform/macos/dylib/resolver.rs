//! Resolution of classified references to canonical filesystem paths.
//!
//! Search order for a reference:
//!
//! 1. Literal candidates for its class: the path itself for absolute and
//!    framework references (Homebrew `*` wildcards expanded), the consuming
//!    binary's `LC_RPATH` entries followed by the private frameworks and
//!    libraries directories for `@rpath/`, the loader directory for
//!    `@loader_path/`.
//! 2. Each fallback search directory in order: the same framework suffix or
//!    file name, then a version-suffixed variant of the file name.
//!
//! The first existing candidate wins. Among several versioned variants in one
//! directory the highest numeric version wins, ties broken by the
//! lexicographically last file name.

use super::{
    inspector::{Inspector, ObjectKind},
    layout::{BundleLayout, expand_executable_path},
    reference::{
        EXECUTABLE_PATH_TOKEN, LOADER_PATH_TOKEN, LibraryReference, RPATH_TOKEN, ReferenceKind,
        split_framework, strip_token,
    },
};
use crate::bundler::error::{Error, ErrorExt, Result};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What kind of thing a resolved dependency is, which decides where it lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LibraryKind {
    /// A binary inside a `.framework` directory; the whole tree is copied.
    Framework,
    /// A loose dylib.
    PlainLibrary,
    /// A helper executable.
    Executable,
}

/// Framework directory a resolved binary belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameworkLocation {
    /// Canonical framework directory, the deduplication key for the tree.
    pub root: PathBuf,
    /// Directory name, e.g. `QtCore.framework`.
    pub name: String,
    /// Binary path below the framework directory as the reference spelled it.
    pub subpath: PathBuf,
}

/// A reference paired with the real file it names.
#[derive(Clone, Debug)]
pub struct ResolvedLibrary {
    /// The reference that was resolved.
    pub reference: LibraryReference,
    /// First existing candidate, before symlink resolution.
    pub located: PathBuf,
    /// Canonical path; the deduplication key for copies.
    pub source: PathBuf,
    /// Destination category.
    pub kind: LibraryKind,
    /// Set for framework binaries.
    pub framework: Option<FrameworkLocation>,
}

/// Per-binary inputs to resolution.
#[derive(Clone, Copy, Debug)]
pub struct ResolveContext<'a> {
    /// Binary holding the reference.
    pub binary: &'a Path,
    /// Directory `@loader_path` expands to. For a copied library this is the
    /// directory of the original, so siblings of the original are still found.
    pub loader_dir: &'a Path,
    /// Directory `@executable_path` expands to.
    pub executable_dir: &'a Path,
    /// The binary's `LC_RPATH` entries.
    pub search_paths: &'a [String],
}

/// Resolves references against one bundle layout and a list of fallback directories.
#[derive(Clone, Copy, Debug)]
pub struct Resolver<'a> {
    layout: &'a BundleLayout,
    search_dirs: &'a [PathBuf],
}

impl<'a> Resolver<'a> {
    /// Creates a resolver.
    pub fn new(layout: &'a BundleLayout, search_dirs: &'a [PathBuf]) -> Self {
        Self {
            layout,
            search_dirs,
        }
    }

    /// Resolves `reference` to a canonical file.
    ///
    /// # Errors
    ///
    /// [`Error::UnresolvedDependency`] when no candidate exists.
    pub fn resolve<I: Inspector>(
        &self,
        reference: &LibraryReference,
        ctx: &ResolveContext<'_>,
        inspector: &I,
    ) -> Result<ResolvedLibrary> {
        let unresolved = || Error::UnresolvedDependency {
            binary: ctx.binary.to_path_buf(),
            reference: reference.raw().to_string(),
        };

        let located = self.locate(reference, ctx)?.ok_or_else(unresolved)?;
        let source = std::fs::canonicalize(&located).map_err(|_| unresolved())?;
        let framework = framework_location(&located)?;

        let kind = if framework.is_some() {
            LibraryKind::Framework
        } else if matches!(inspector.probe(&source), Ok(ObjectKind::Executable)) {
            LibraryKind::Executable
        } else {
            LibraryKind::PlainLibrary
        };

        log::debug!(
            "Resolved `{}` from {} to {} ({:?})",
            reference.raw(),
            ctx.binary.display(),
            source.display(),
            kind
        );

        Ok(ResolvedLibrary {
            reference: reference.clone(),
            located,
            source,
            kind,
            framework,
        })
    }

    /// Returns the first existing path for `reference`, without canonicalizing it.
    pub fn locate(
        &self,
        reference: &LibraryReference,
        ctx: &ResolveContext<'_>,
    ) -> Result<Option<PathBuf>> {
        for candidate in self.candidates(reference, ctx)? {
            if candidate.exists() {
                return Ok(Some(candidate));
            }
            log::trace!("  no {}", candidate.display());
        }

        match reference.kind() {
            ReferenceKind::System | ReferenceKind::AlreadyBundled => Ok(None),
            _ => self.search_fallback(reference),
        }
    }

    /// Literal candidates for `reference`, in probe order.
    pub fn candidates(
        &self,
        reference: &LibraryReference,
        ctx: &ResolveContext<'_>,
    ) -> Result<Vec<PathBuf>> {
        let raw = reference.raw();
        let mut candidates = Vec::new();

        match reference.kind() {
            ReferenceKind::System => {}
            ReferenceKind::AlreadyBundled => {
                candidates.extend(expand_executable_path(raw, ctx.executable_dir));
            }
            ReferenceKind::RuntimeSearchPathRelative => {
                if let Some(rest) = strip_token(raw, LOADER_PATH_TOKEN) {
                    candidates.push(ctx.loader_dir.join(rest));
                } else if let Some(rest) = strip_token(raw, RPATH_TOKEN) {
                    for entry in ctx.search_paths {
                        if let Some(dir) = self.expand_search_path(entry, ctx) {
                            candidates.push(dir.join(rest));
                        }
                    }
                    candidates.push(self.layout.frameworks().join(rest));
                    candidates.push(self.layout.libraries().join(rest));
                }
            }
            ReferenceKind::FrameworkRelative | ReferenceKind::Absolute => {
                if raw.contains('*') {
                    candidates.extend(expand_wildcard(raw)?);
                } else if Path::new(raw).is_absolute() {
                    candidates.push(PathBuf::from(raw));
                } else {
                    candidates.push(ctx.loader_dir.join(raw));
                }
            }
        }

        let mut seen = std::collections::HashSet::new();
        candidates.retain(|c| seen.insert(c.clone()));
        Ok(candidates)
    }

    /// Expands one `LC_RPATH` entry to a directory.
    fn expand_search_path(&self, entry: &str, ctx: &ResolveContext<'_>) -> Option<PathBuf> {
        if let Some(rest) = expand_placeholder(entry, LOADER_PATH_TOKEN) {
            Some(join_nonempty(ctx.loader_dir, rest))
        } else if let Some(rest) = expand_placeholder(entry, EXECUTABLE_PATH_TOKEN) {
            Some(join_nonempty(ctx.executable_dir, rest))
        } else if Path::new(entry).is_absolute() {
            Some(PathBuf::from(entry))
        } else {
            log::debug!(
                "Ignoring unusable search path `{}` of {}",
                entry,
                ctx.binary.display()
            );
            None
        }
    }

    /// Looks for the reference's framework suffix or file name in the fallback directories.
    fn search_fallback(&self, reference: &LibraryReference) -> Result<Option<PathBuf>> {
        if let Some(suffix) = reference.framework_suffix() {
            for dir in self.search_dirs {
                let candidate = dir.join(suffix);
                if candidate.exists() {
                    log::debug!("`{}` found via fallback {}", reference.raw(), dir.display());
                    return Ok(Some(candidate));
                }
            }
            return Ok(None);
        }

        let name = reference.file_name();
        if name.is_empty() {
            return Ok(None);
        }
        for dir in self.search_dirs {
            let exact = dir.join(name);
            if exact.exists() {
                log::debug!("`{}` found via fallback {}", reference.raw(), dir.display());
                return Ok(Some(exact));
            }
            if let Some(versioned) = versioned_match(dir, name)? {
                log::info!(
                    "`{}` matched versioned variant {}",
                    reference.raw(),
                    versioned.display()
                );
                return Ok(Some(versioned));
            }
        }
        Ok(None)
    }
}

/// Returns the remainder after `token` when `entry` is exactly `token` or `token/...`.
fn expand_placeholder<'e>(entry: &'e str, token: &str) -> Option<&'e str> {
    if entry == token {
        Some("")
    } else {
        strip_token(entry, token)
    }
}

fn join_nonempty(dir: &Path, rest: &str) -> PathBuf {
    if rest.is_empty() {
        dir.to_path_buf()
    } else {
        dir.join(rest)
    }
}

/// Expands Homebrew-style wildcard paths such as `/opt/homebrew/*/lib/libpcre2.dylib`.
///
/// The pattern is tried as written, then against the Cellar. Matches are sorted.
fn expand_wildcard(raw: &str) -> Result<Vec<PathBuf>> {
    let mut patterns = vec![raw.to_string()];
    if let Some(after_homebrew) = raw.strip_prefix("/opt/homebrew/*/") {
        patterns.push(format!("/opt/homebrew/Cellar/*/{after_homebrew}"));
    }

    let mut matches = Vec::new();
    for pattern in patterns {
        let mut found: Vec<PathBuf> = glob::glob(&pattern)?.flatten().collect();
        found.sort();
        matches.extend(found);
    }
    Ok(matches)
}

/// Finds the best version-suffixed variant of `name` in `dir`.
///
/// `libfoo.1.dylib` accepts `libfoo.dylib`, `libfoo.1.2.dylib` and
/// `libfoo-2.dylib`. Highest version wins; equal versions fall back to the
/// lexicographically last name.
pub fn versioned_match(dir: &Path, name: &str) -> Result<Option<PathBuf>> {
    let Some((stem, ext)) = split_library_name(name) else {
        return Ok(None);
    };
    let pattern = format!(
        r"^{}(?:[.-]([0-9]+(?:\.[0-9]+)*))?\.{}$",
        regex::escape(stem),
        regex::escape(ext)
    );
    let re = Regex::new(&pattern)?;

    let Ok(entries) = std::fs::read_dir(dir) else {
        return Ok(None);
    };

    let best = entries
        .flatten()
        .filter_map(|entry| {
            let file_name = entry.file_name().into_string().ok()?;
            let captures = re.captures(&file_name)?;
            let version = captures
                .get(1)
                .map(|m| parse_version(m.as_str()))
                .unwrap_or_default();
            Some((version, file_name))
        })
        .max();

    Ok(best.map(|(_, file_name)| dir.join(file_name)))
}

/// Splits `libfoo.1.2.dylib` into (`libfoo`, `dylib`).
fn split_library_name(name: &str) -> Option<(&str, &str)> {
    let first_dot = name.find('.')?;
    let last_dot = name.rfind('.')?;
    let stem = &name[..first_dot];
    let ext = &name[last_dot + 1..];
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some((stem, ext))
}

fn parse_version(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

/// Locates the framework directory containing `located`, if any.
fn framework_location(located: &Path) -> Result<Option<FrameworkLocation>> {
    let located_str = located.to_string_lossy();
    let Some((root, subpath)) = split_framework(&located_str) else {
        return Ok(None);
    };

    let root = PathBuf::from(root);
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let canonical_root =
        std::fs::canonicalize(&root).fs_context("failed to canonicalize framework", &root)?;

    Ok(Some(FrameworkLocation {
        root: canonical_root,
        name,
        subpath: PathBuf::from(subpath),
    }))
}
