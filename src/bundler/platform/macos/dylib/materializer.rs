//! Copies resolved dependencies into the bundle's private directories.
//!
//! Every source is copied at most once per run, keyed by its canonical path.
//! Frameworks are copied as whole directory trees and keyed by their canonical
//! framework directory, so two binaries of the same framework share one copy.

use super::{
    layout::BundleLayout,
    resolver::{LibraryKind, ResolvedLibrary},
};
use crate::bundler::{
    error::{Error, Result},
    utils::fs::{self, EXECUTABLE_MODE, LIBRARY_MODE},
};
use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

/// Where a dependency lives inside the bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleEntry {
    /// Canonical source path.
    pub source: PathBuf,
    /// Binary to reference from consumers.
    pub destination: PathBuf,
    /// Copied framework directory, or `destination` for loose files.
    pub root: PathBuf,
    /// Destination category.
    pub kind: LibraryKind,
    /// True only for the call that actually performed the copy.
    pub copied: bool,
}

/// Tracks what has already been placed in the bundle during one run.
#[derive(Debug)]
pub struct Materializer<'a> {
    layout: &'a BundleLayout,
    by_source: HashMap<PathBuf, BundleEntry>,
    frameworks: HashMap<PathBuf, PathBuf>,
    /// Framework roots whose tree was copied during this run.
    copied_frameworks: HashSet<PathBuf>,
    destinations: HashMap<PathBuf, PathBuf>,
}

impl<'a> Materializer<'a> {
    /// Creates an empty materializer for `layout`.
    pub fn new(layout: &'a BundleLayout) -> Self {
        Self {
            layout,
            by_source: HashMap::new(),
            frameworks: HashMap::new(),
            copied_frameworks: HashSet::new(),
            destinations: HashMap::new(),
        }
    }

    /// Ensures `resolved` is present in the bundle and returns its location.
    ///
    /// Sources already inside the bundle are used in place. Existing
    /// destinations are never overwritten.
    ///
    /// # Errors
    ///
    /// [`Error::Materialization`] when the copy fails.
    pub async fn materialize(&mut self, resolved: &ResolvedLibrary) -> Result<BundleEntry> {
        if let Some(entry) = self.by_source.get(&resolved.source) {
            return Ok(BundleEntry {
                copied: false,
                ..entry.clone()
            });
        }

        let layout = self.layout;
        let entry = if layout.contains(&resolved.source) {
            BundleEntry {
                source: resolved.source.clone(),
                destination: resolved.source.clone(),
                root: resolved
                    .framework
                    .as_ref()
                    .map(|fw| fw.root.clone())
                    .unwrap_or_else(|| resolved.source.clone()),
                kind: resolved.kind,
                copied: false,
            }
        } else {
            match (resolved.kind, &resolved.framework) {
                (LibraryKind::Framework, Some(framework)) => {
                    let dest_root = layout.frameworks().join(&framework.name);
                    let copied = if self.frameworks.contains_key(&framework.root) {
                        false
                    } else {
                        self.check_collision(&dest_root, &framework.root);
                        self.copy_framework(&framework.root, &dest_root).await?
                    };
                    self.frameworks
                        .insert(framework.root.clone(), dest_root.clone());
                    if copied {
                        self.copied_frameworks.insert(framework.root.clone());
                    }

                    let destination = dest_root.join(&framework.subpath);
                    if !destination.exists() {
                        return Err(Error::Materialization {
                            origin: resolved.source.clone(),
                            destination,
                            reason: "framework copy does not contain the referenced binary"
                                .to_string(),
                        });
                    }
                    // Referenced binaries are libraries even when the tree kept an exec bit
                    if self.copied_frameworks.contains(&framework.root) {
                        fs::set_mode(&destination, LIBRARY_MODE)
                            .await
                            .map_err(|e| copy_error(&resolved.source, &destination, e))?;
                    }

                    BundleEntry {
                        source: resolved.source.clone(),
                        destination,
                        root: dest_root,
                        kind: LibraryKind::Framework,
                        copied,
                    }
                }
                (LibraryKind::Executable, _) => {
                    self.copy_loose(resolved, layout.helpers(), EXECUTABLE_MODE)
                        .await?
                }
                _ => {
                    self.copy_loose(resolved, layout.libraries(), LIBRARY_MODE)
                        .await?
                }
            }
        };

        self.by_source
            .insert(resolved.source.clone(), entry.clone());
        Ok(entry)
    }

    /// Returns the entry recorded for a canonical source, if any.
    pub fn entry(&self, source: &Path) -> Option<&BundleEntry> {
        self.by_source.get(source)
    }

    async fn copy_framework(&self, source_root: &Path, dest_root: &Path) -> Result<bool> {
        if dest_root.exists() {
            log::debug!("{} already present", dest_root.display());
            return Ok(false);
        }
        log::info!(
            "Copying framework {} -> {}",
            source_root.display(),
            dest_root.display()
        );
        if let Err(e) = fs::copy_dir(source_root, dest_root).await {
            // A partial tree would satisfy later lookups into this framework
            if let Err(cleanup) = tokio::fs::remove_dir_all(dest_root).await {
                log::warn!(
                    "Failed to remove partial copy {}: {}",
                    dest_root.display(),
                    cleanup
                );
            }
            return Err(copy_error(source_root, dest_root, e));
        }
        Ok(true)
    }

    async fn copy_loose(
        &mut self,
        resolved: &ResolvedLibrary,
        dir: &Path,
        mode: u32,
    ) -> Result<BundleEntry> {
        let source = &resolved.source;
        let Some(file_name) = source.file_name() else {
            return Err(copy_error(
                source,
                dir,
                Error::GenericError("source has no file name".to_string()),
            ));
        };
        let destination = dir.join(file_name);
        self.check_collision(&destination, source);

        let copied = if destination.exists() {
            log::debug!("{} already present", destination.display());
            false
        } else {
            log::info!("Copying {} -> {}", source.display(), destination.display());
            fs::copy_file(source, &destination)
                .await
                .map_err(|e| copy_error(source, &destination, e))?;
            fs::set_mode(&destination, mode)
                .await
                .map_err(|e| copy_error(source, &destination, e))?;
            true
        };

        Ok(BundleEntry {
            source: source.clone(),
            root: destination.clone(),
            destination,
            kind: resolved.kind,
            copied,
        })
    }

    /// Warns when two different sources want the same destination; the first one wins.
    fn check_collision(&mut self, destination: &Path, source: &Path) {
        match self.destinations.get(destination) {
            Some(existing) if existing != source => log::warn!(
                "{} and {} both map to {}; keeping the first",
                existing.display(),
                source.display(),
                destination.display()
            ),
            Some(_) => {}
            None => {
                self.destinations
                    .insert(destination.to_path_buf(), source.to_path_buf());
            }
        }
    }
}

fn copy_error(origin: &Path, destination: &Path, error: Error) -> Error {
    Error::Materialization {
        origin: origin.to_path_buf(),
        destination: destination.to_path_buf(),
        reason: error.to_string(),
    }
}
