//! File system utilities for relocation.
//!
//! Provides idempotent directory creation, symlink-preserving tree copies,
//! permission normalization, and lexical relative-path computation.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::{
    io,
    path::{Component, Path, PathBuf},
};
use tokio::fs;

/// Mode given to copied libraries: owner-writable so the link editor can patch them.
pub const LIBRARY_MODE: u32 = 0o644;

/// Mode given to copied executables.
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Creates all of the directories of the specified path.
///
/// Succeeds if the directory already exists.
pub async fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .fs_context("failed to create directory", path)
}

/// Copies a regular file, creating the destination's parent directories.
///
/// Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.is_file() {
        return Err(Error::GenericError(format!(
            "{} is not a regular file",
            from.display()
        )));
    }
    if let Some(dest_dir) = to.parent() {
        create_dir_all(dest_dir).await?;
    }
    fs::copy(from, to)
        .await
        .fs_context("failed to copy file to", to)?;
    Ok(())
}

/// Recursively copies a directory tree, creating parent directories as necessary.
///
/// Copied regular files get [`LIBRARY_MODE`], or [`EXECUTABLE_MODE`] when the
/// source had an execute bit, so read-only sources stay patchable.
/// Symlinks are re-created rather than followed. A link whose target is an
/// absolute path inside `from` is rewritten to the equivalent relative link so
/// the copy stays self-consistent after it moves. Links pointing elsewhere are
/// kept verbatim.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    if !from.is_dir() {
        return Err(Error::GenericError(format!(
            "{} is not a directory",
            from.display()
        )));
    }

    let from = from.to_path_buf();
    let to = to.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).fs_context("failed to create directory", parent)?;
        }

        for entry in walkdir::WalkDir::new(&from).follow_links(false) {
            let entry = entry?;
            let rel_path = entry.path().strip_prefix(&from)?;
            let dest_path = to.join(rel_path);

            if entry.file_type().is_symlink() {
                let target = std::fs::read_link(entry.path())
                    .fs_context("failed to read symlink", entry.path())?;
                let target = relink_target(&from, entry.path(), &target);
                symlink(&target, &dest_path).fs_context("failed to create symlink", &dest_path)?;
            } else if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dest_path)
                    .fs_context("failed to create directory", &dest_path)?;
            } else {
                std::fs::copy(entry.path(), &dest_path)
                    .fs_context("failed to copy file to", &dest_path)?;
                normalize_mode(&dest_path, &entry.metadata()?)?;
            }
        }

        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("Directory copy task panicked: {e}")))?
}

/// Maps a symlink target found at `link` inside the tree `root` to the target
/// the copied link should carry.
fn relink_target(root: &Path, link: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() && target.starts_with(root) {
        let link_dir = link.parent().unwrap_or(root);
        relative_path(link_dir, target)
    } else {
        target.to_path_buf()
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(unix)]
fn normalize_mode(path: &Path, source: &std::fs::Metadata) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = if is_executable(source) {
        EXECUTABLE_MODE
    } else {
        LIBRARY_MODE
    };
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .fs_context("failed to set permissions on", path)
}

#[cfg(not(unix))]
fn normalize_mode(_path: &Path, _source: &std::fs::Metadata) -> Result<()> {
    Ok(())
}

/// Sets the permission bits of `path`.
#[cfg(unix)]
pub async fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .fs_context("failed to set permissions on", path)
}

/// Sets the permission bits of `path`.
#[cfg(not(unix))]
pub async fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Returns true when any execute bit is set on a regular file.
#[cfg(unix)]
pub fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.is_file() && metadata.permissions().mode() & 0o111 != 0
}

/// Returns true when any execute bit is set on a regular file.
#[cfg(not(unix))]
pub fn is_executable(metadata: &std::fs::Metadata) -> bool {
    metadata.is_file()
}

/// Computes the path of `to` relative to the directory `from_dir`.
///
/// Purely lexical: both paths should already be canonical.
pub fn relative_path(from_dir: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component<'_>> = from_dir.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();
    let common = from
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..from.len() {
        out.push("..");
    }
    for component in &to[common..] {
        out.push(component.as_os_str());
    }
    out
}

/// Renders a path with forward slashes, the form load commands store.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
