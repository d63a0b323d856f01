//! Binary inspection capability.
//!
//! The traversal only needs four facts about a file: whether it is a
//! relocatable Mach-O image, its own install name, its `LC_LOAD_*DYLIB`
//! references and its `LC_RPATH` entries. [`Inspector`] is the seam; the
//! default [`MachOInspector`] reads the load commands with goblin.

use crate::bundler::error::{Error, ErrorExt, Result};
use goblin::mach::{Mach, MachO, SingleArch, header};
use std::path::Path;

/// Coarse file type reported by the probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    /// `MH_EXECUTE` image.
    Executable,
    /// `MH_DYLIB` or `MH_BUNDLE` image.
    Library,
    /// Anything else; never inspected further.
    Other,
}

/// What the inspector learned about one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inspection {
    /// File type.
    pub kind: ObjectKind,
    /// Install name (`LC_ID_DYLIB`), libraries only.
    pub identity: Option<String>,
    /// Declared dependency references in load-command order.
    pub dependencies: Vec<String>,
    /// Declared runtime search paths in load-command order.
    pub search_paths: Vec<String>,
}

impl Inspection {
    /// Result for a file that is not a relocatable object.
    pub fn not_relocatable() -> Self {
        Self {
            kind: ObjectKind::Other,
            identity: None,
            dependencies: Vec::new(),
            search_paths: Vec::new(),
        }
    }

    /// True for executables and libraries.
    pub fn is_relocatable(&self) -> bool {
        matches!(self.kind, ObjectKind::Executable | ObjectKind::Library)
    }
}

/// Reads dependency information from binaries.
pub trait Inspector {
    /// Inspects `path`.
    ///
    /// A file that is not a relocatable object yields
    /// [`Inspection::not_relocatable`], not an error.
    ///
    /// # Errors
    ///
    /// [`Error::Inspection`] when the file cannot be read or looks like an
    /// object but cannot be parsed.
    fn inspect(&self, path: &Path) -> Result<Inspection>;

    /// Classifies `path` without needing its dependency lists.
    fn probe(&self, path: &Path) -> Result<ObjectKind> {
        self.inspect(path).map(|inspection| inspection.kind)
    }
}

/// Mach-O inspector backed by goblin.
///
/// Universal binaries are read through their first slice; every slice of a
/// well-formed universal binary carries the same load commands.
#[derive(Clone, Copy, Debug, Default)]
pub struct MachOInspector;

impl Inspector for MachOInspector {
    fn inspect(&self, path: &Path) -> Result<Inspection> {
        let buffer = std::fs::read(path)
            .fs_context("failed to read binary", path)
            .map_err(|e| inspection_error(path, e))?;

        if !has_macho_magic(&buffer) {
            return Ok(Inspection::not_relocatable());
        }

        let mach = Mach::parse(&buffer).map_err(|e| inspection_error(path, e.into()))?;
        match mach {
            Mach::Binary(macho) => Ok(from_macho(&macho)),
            Mach::Fat(multi) => match multi.get(0) {
                Ok(SingleArch::MachO(macho)) => Ok(from_macho(&macho)),
                Ok(SingleArch::Archive(_)) => Ok(Inspection::not_relocatable()),
                Err(e) => Err(inspection_error(path, e.into())),
            },
        }
    }
}

fn from_macho(macho: &MachO<'_>) -> Inspection {
    let kind = match macho.header.filetype {
        header::MH_EXECUTE => ObjectKind::Executable,
        header::MH_DYLIB | header::MH_BUNDLE => ObjectKind::Library,
        _ => ObjectKind::Other,
    };
    if kind == ObjectKind::Other {
        return Inspection::not_relocatable();
    }

    // goblin lists the image itself as "self" ahead of the real dependencies
    let dependencies = macho
        .libs
        .iter()
        .filter(|lib| **lib != "self")
        .map(|lib| lib.to_string())
        .collect();

    Inspection {
        kind,
        identity: macho.name.map(str::to_owned),
        dependencies,
        search_paths: macho.rpaths.iter().map(|p| p.to_string()).collect(),
    }
}

fn has_macho_magic(buffer: &[u8]) -> bool {
    const FAT_MAGIC: u32 = 0xcafe_babe;
    // Java class files share the fat magic; their version lands on nfat_arch
    const MAX_FAT_ARCHES: u32 = 20;

    let Some(magic) = read_be_u32(buffer, 0) else {
        return false;
    };
    if magic == FAT_MAGIC {
        return read_be_u32(buffer, 4).is_some_and(|count| (1..MAX_FAT_ARCHES).contains(&count));
    }
    [magic, magic.swap_bytes()]
        .iter()
        .any(|m| matches!(*m, header::MH_MAGIC | header::MH_MAGIC_64))
}

fn read_be_u32(buffer: &[u8], offset: usize) -> Option<u32> {
    let bytes = buffer.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn inspection_error(path: &Path, error: Error) -> Error {
    Error::Inspection {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
}
