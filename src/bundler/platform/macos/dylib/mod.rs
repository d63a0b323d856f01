//! Dylib and framework relocation for macOS app bundles.
//!
//! A bundle is self-contained when every non-system library reachable from
//! its executables lives inside it and every reference to such a library is
//! expressed relative to the main executable (`@executable_path/...`).
//!
//! The pieces, bottom-up:
//!
//! - [`reference`]: classifies raw load-command strings
//! - [`inspector`]: reads file type, install name, dependencies and rpaths
//! - [`resolver`]: maps a reference to a canonical file
//! - [`materializer`]: copies files and framework trees into the bundle
//! - [`rewriter`]: patches references with `install_name_tool`
//! - [`driver`]: the depth-first traversal tying them together
//! - [`scan`]: the same walk without side effects

pub mod driver;
pub mod inspector;
pub mod layout;
pub mod materializer;
pub mod reference;
pub mod report;
pub mod resolver;
pub mod rewriter;
pub mod scan;

pub use driver::{BinaryNode, NodeRole, Traversal, discover_roots};
pub use inspector::{Inspection, Inspector, MachOInspector, ObjectKind};
pub use layout::BundleLayout;
pub use materializer::{BundleEntry, Materializer};
pub use reference::{LibraryReference, ReferenceKind, classify};
pub use report::{
    CopyRecord, Failure, FailureKind, IdentityRecord, RelocationReport, RewriteRecord, RunStatus,
    UnresolvedRecord,
};
pub use resolver::{FrameworkLocation, LibraryKind, ResolveContext, ResolvedLibrary, Resolver};
pub use rewriter::{InstallNameTool, Rewriter};
pub use scan::{ScanReport, scan};
