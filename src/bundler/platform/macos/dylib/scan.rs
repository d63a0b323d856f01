//! Read-only dependency listing.
//!
//! Walks the same graph as the relocation traversal but never copies or
//! rewrites anything. Useful to see what a bundle would pull in.

use super::{
    driver::{BinaryNode, NodeRole, discover_roots},
    inspector::Inspector,
    layout::BundleLayout,
    reference::{LibraryReference, ReferenceKind},
    report::UnresolvedRecord,
    resolver::{ResolveContext, Resolver},
};
use crate::bundler::{error::Result, settings::Settings};
use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    path::{Path, PathBuf},
};

/// External libraries a bundle needs, keyed by canonical path.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ScanReport {
    /// Canonical source path to the raw references that name it.
    pub libraries: BTreeMap<PathBuf, BTreeSet<String>>,
    pub unresolved: Vec<UnresolvedRecord>,
}

/// Lists every non-system library reachable from the bundle's executables
/// that does not already live inside the bundle.
pub fn scan<I: Inspector>(
    settings: &Settings,
    layout: &BundleLayout,
    inspector: &I,
) -> Result<ScanReport> {
    let resolver = Resolver::new(layout, settings.search_dirs());
    let mut report = ScanReport::default();
    let mut visited = HashSet::new();
    let mut stack: Vec<BinaryNode> = discover_roots(layout)?;
    stack.reverse();

    while let Some(node) = stack.pop() {
        let Ok(path) = std::fs::canonicalize(&node.path) else {
            continue;
        };
        if !visited.insert(path.clone()) {
            continue;
        }

        let inspection = match inspector.inspect(&path) {
            Ok(inspection) if inspection.is_relocatable() => inspection,
            Ok(_) => continue,
            Err(e) => {
                log::warn!("{e}");
                continue;
            }
        };

        let executable_dir = layout.executable_dir_for(&path, inspection.kind);
        let ctx = ResolveContext {
            binary: &path,
            loader_dir: &node.loader_dir,
            executable_dir,
            search_paths: &inspection.search_paths,
        };

        for raw in &inspection.dependencies {
            let reference = LibraryReference::classify(raw.as_str(), settings.system_prefixes());
            if reference.kind() == ReferenceKind::System {
                continue;
            }

            let Some(source) = resolver
                .locate(&reference, &ctx)
                .ok()
                .flatten()
                .and_then(|located| std::fs::canonicalize(located).ok())
            else {
                report.unresolved.push(UnresolvedRecord {
                    binary: path.clone(),
                    reference: raw.clone(),
                });
                continue;
            };

            if !layout.contains(&source) {
                report
                    .libraries
                    .entry(source.clone())
                    .or_default()
                    .insert(raw.clone());
            }
            let loader_dir = source.parent().map(Path::to_path_buf).unwrap_or_default();
            stack.push(BinaryNode {
                path: source,
                loader_dir,
                role: NodeRole::Bundled,
            });
        }
    }

    Ok(report)
}
