//! Depth-first relocation of a bundle's dependency graph.
//!
//! Each binary is visited once. A visit inspects the binary, resolves and
//! materializes every non-system dependency, recurses into the bundled copy,
//! and only then rewrites the binary's own references. Children are therefore
//! fully processed before their parent is patched, and revisiting a node is a
//! no-op, which terminates cycles.
//!
//! Per-node and per-edge failures are recorded in the [`RelocationReport`]
//! and never abort the walk.

use super::{
    inspector::{Inspector, ObjectKind},
    layout::{BundleLayout, executable_relative_reference},
    materializer::Materializer,
    reference::{LibraryReference, ReferenceKind},
    report::{FailureKind, RelocationReport},
    resolver::{ResolveContext, Resolver},
    rewriter::Rewriter,
};
use crate::bundler::{
    error::{Error, Result},
    settings::Settings,
    utils::fs,
};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

/// Why a binary is being visited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeRole {
    /// `CFBundleExecutable`.
    MainExecutable,
    /// Any other executable shipped with the bundle.
    Root,
    /// A dependency living in the private directories; its identity is rewritten.
    Bundled,
}

/// A binary queued for a visit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryNode {
    /// File to inspect and patch.
    pub path: PathBuf,
    /// Directory `@loader_path` expands to for this binary.
    pub loader_dir: PathBuf,
    /// Decides whether the binary's own identity is rewritten.
    pub role: NodeRole,
}

impl BinaryNode {
    /// Node for a file that sits where it was found.
    pub fn in_place(path: PathBuf, role: NodeRole) -> Self {
        let loader_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self {
            path,
            loader_dir,
            role,
        }
    }
}

/// Finds every executable file under the bundle root.
///
/// The main executable comes first; the rest follow in file-name order.
/// Executables inside the private directories are treated as bundled
/// dependencies.
pub fn discover_roots(layout: &BundleLayout) -> Result<Vec<BinaryNode>> {
    let main = layout
        .main_executable()
        .and_then(|path| std::fs::canonicalize(path).ok());

    let mut roots = Vec::new();
    for entry in walkdir::WalkDir::new(layout.root())
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let metadata = entry.metadata()?;
        if !fs::is_executable(&metadata) {
            continue;
        }

        let path = entry.into_path();
        let role = if main.as_deref() == Some(path.as_path()) {
            NodeRole::MainExecutable
        } else if layout.is_private(&path) {
            NodeRole::Bundled
        } else {
            NodeRole::Root
        };
        roots.push(BinaryNode::in_place(path, role));
    }

    roots.sort_by_key(|node| node.role != NodeRole::MainExecutable);
    log::debug!("Discovered {} executable roots", roots.len());
    Ok(roots)
}

/// One relocation walk over a bundle.
pub struct Traversal<'a, I, R> {
    settings: &'a Settings,
    layout: &'a BundleLayout,
    inspector: &'a I,
    rewriter: &'a R,
    resolver: Resolver<'a>,
    materializer: Materializer<'a>,
    visited: HashSet<PathBuf>,
    report: RelocationReport,
}

impl<'a, I: Inspector, R: Rewriter> Traversal<'a, I, R> {
    pub fn new(
        settings: &'a Settings,
        layout: &'a BundleLayout,
        inspector: &'a I,
        rewriter: &'a R,
    ) -> Self {
        Self {
            settings,
            layout,
            inspector,
            rewriter,
            resolver: Resolver::new(layout, settings.search_dirs()),
            materializer: Materializer::new(layout),
            visited: HashSet::new(),
            report: RelocationReport::new(layout.root()),
        }
    }

    /// Visits every root in order and returns the finished report.
    pub async fn run(mut self, roots: Vec<BinaryNode>) -> RelocationReport {
        for root in roots {
            self.visit(root).await;
        }
        self.report.finish();
        self.report
    }

    async fn visit(&mut self, node: BinaryNode) {
        let path = match std::fs::canonicalize(&node.path) {
            Ok(path) => path,
            Err(e) => {
                log::error!("Cannot open {}: {}", node.path.display(), e);
                self.report.attempted += 1;
                self.report
                    .record_failure(FailureKind::Inspection, &node.path, None, None, e.to_string());
                return;
            }
        };
        if !self.visited.insert(path.clone()) {
            log::trace!("Already visited {}", path.display());
            return;
        }
        self.report.visited += 1;
        self.report.attempted += 1;

        let inspection = match self.inspector.inspect(&path) {
            Ok(inspection) => inspection,
            Err(e) => {
                log::error!("{e}");
                self.report
                    .record_failure(FailureKind::Inspection, &path, None, None, e.to_string());
                return;
            }
        };
        if !inspection.is_relocatable() {
            log::debug!("Skipping {}: not a relocatable object", path.display());
            return;
        }
        log::info!("Processing {} ({:?})", path.display(), node.role);

        let executable_dir = self
            .layout
            .executable_dir_for(&path, inspection.kind)
            .to_path_buf();
        let ctx = ResolveContext {
            binary: &path,
            loader_dir: &node.loader_dir,
            executable_dir: &executable_dir,
            search_paths: &inspection.search_paths,
        };

        let mut edges = Vec::new();
        for raw in &inspection.dependencies {
            let reference = LibraryReference::classify(raw.as_str(), self.settings.system_prefixes());
            match reference.kind() {
                ReferenceKind::System => {
                    log::debug!("  `{raw}` is a system library");
                    self.report.system_references += 1;
                    continue;
                }
                ReferenceKind::AlreadyBundled => {
                    self.follow_bundled(&path, &reference, &ctx).await;
                    continue;
                }
                _ => {}
            }

            let resolved = match self.resolver.resolve(&reference, &ctx, self.inspector) {
                Ok(resolved) => resolved,
                Err(e) => {
                    log::warn!("{e}");
                    self.report.record_unresolved(&path, raw);
                    continue;
                }
            };

            self.report.attempted += 1;
            let entry = match self.materializer.materialize(&resolved).await {
                Ok(entry) => entry,
                Err(e) => {
                    log::error!("{e}");
                    let destination = match &e {
                        Error::Materialization { destination, .. } => Some(destination.clone()),
                        _ => None,
                    };
                    self.report.record_failure(
                        FailureKind::Materialization,
                        &path,
                        Some(raw),
                        destination.as_deref(),
                        e.to_string(),
                    );
                    continue;
                }
            };
            if entry.copied {
                self.report
                    .record_copy(&entry.source, &entry.destination, entry.kind);
            }

            let loader_dir = resolved
                .source
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            Box::pin(self.visit(BinaryNode {
                path: entry.destination.clone(),
                loader_dir,
                role: NodeRole::Bundled,
            }))
            .await;

            edges.push((
                raw.clone(),
                executable_relative_reference(&executable_dir, &entry.destination),
            ));
        }

        for (old, new) in edges {
            if old == new {
                continue;
            }
            self.report.attempted += 1;
            match self.rewriter.change_reference(&path, &old, &new) {
                Ok(()) => {
                    log::info!("  {}: `{}` -> `{}`", path.display(), old, new);
                    self.report.record_rewrite(&path, &old, &new);
                }
                Err(e) => {
                    log::error!("{e}");
                    self.report.record_failure(
                        FailureKind::Rewrite,
                        &path,
                        Some(&old),
                        None,
                        e.to_string(),
                    );
                }
            }
        }

        if node.role == NodeRole::Bundled && inspection.kind == ObjectKind::Library {
            self.rewrite_identity(&path, inspection.identity.as_deref());
        }
    }

    /// Visits the target of an `@executable_path/` reference without rewriting it.
    async fn follow_bundled(
        &mut self,
        binary: &Path,
        reference: &LibraryReference,
        ctx: &ResolveContext<'_>,
    ) {
        let target = self
            .resolver
            .locate(reference, ctx)
            .ok()
            .flatten()
            .and_then(|located| std::fs::canonicalize(located).ok())
            .filter(|target| self.layout.contains(target));

        match target {
            Some(target) => {
                log::debug!("  `{}` already bundled", reference.raw());
                Box::pin(self.visit(BinaryNode::in_place(target, NodeRole::Bundled))).await;
            }
            None => {
                log::warn!(
                    "Unresolved dependency `{}` of {}: not present in the bundle",
                    reference.raw(),
                    binary.display()
                );
                self.report.record_unresolved(binary, reference.raw());
            }
        }
    }

    fn rewrite_identity(&mut self, path: &Path, current: Option<&str>) {
        let Some(current) = current else {
            return;
        };
        let desired = self.layout.bundle_relative_reference(path);
        if current == desired {
            return;
        }

        self.report.attempted += 1;
        match self.rewriter.change_identity(path, &desired) {
            Ok(()) => {
                log::info!("  {}: id `{}` -> `{}`", path.display(), current, desired);
                self.report.record_identity(path, &desired);
            }
            Err(e) => {
                log::error!("{e}");
                self.report.record_failure(
                    FailureKind::Rewrite,
                    path,
                    Some(current),
                    None,
                    e.to_string(),
                );
            }
        }
    }
}
