//! Canonical bundle layout.

use super::{
    inspector::ObjectKind,
    reference::{EXECUTABLE_PATH_TOKEN, strip_token},
};
use crate::bundler::{
    error::{Error, ErrorExt, Result},
    settings::Settings,
    utils::fs,
};
use std::path::{Path, PathBuf};

/// The bundle root and its well-known subdirectories, all canonical.
#[derive(Clone, Debug)]
pub struct BundleLayout {
    root: PathBuf,
    executables: PathBuf,
    frameworks: PathBuf,
    libraries: PathBuf,
    helpers: PathBuf,
}

impl BundleLayout {
    /// Resolves the layout without creating anything.
    ///
    /// # Errors
    ///
    /// [`Error::BundleRootMissing`] if the root is absent or not a directory.
    pub fn open(settings: &Settings) -> Result<Self> {
        let configured = settings.bundle_root();
        if !configured.is_dir() {
            return Err(Error::BundleRootMissing(configured.to_path_buf()));
        }
        let root = std::fs::canonicalize(configured)
            .fs_context("failed to canonicalize bundle root", configured)?;

        let layout = settings.layout();
        Ok(Self {
            executables: root.join(&layout.executables),
            frameworks: root.join(&layout.frameworks),
            libraries: root.join(&layout.libraries),
            helpers: root.join(&layout.helpers),
            root,
        })
    }

    /// Resolves the layout and creates every missing subdirectory.
    pub async fn prepare(settings: &Settings) -> Result<Self> {
        let layout = Self::open(settings)?;
        for dir in [
            &layout.executables,
            &layout.frameworks,
            &layout.libraries,
            &layout.helpers,
        ] {
            if !dir.is_dir() {
                log::info!("Creating {}", dir.display());
            }
            fs::create_dir_all(dir).await?;
        }
        Ok(layout)
    }

    /// Bundle root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Executables directory (`Contents/MacOS`).
    pub fn executables(&self) -> &Path {
        &self.executables
    }

    /// Private frameworks directory.
    pub fn frameworks(&self) -> &Path {
        &self.frameworks
    }

    /// Private libraries directory.
    pub fn libraries(&self) -> &Path {
        &self.libraries
    }

    /// Private helper executables directory.
    pub fn helpers(&self) -> &Path {
        &self.helpers
    }

    /// True when `path` lies inside the bundle.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    /// True when `path` lies inside one of the private dependency directories.
    pub fn is_private(&self, path: &Path) -> bool {
        path.starts_with(&self.frameworks)
            || path.starts_with(&self.libraries)
            || path.starts_with(&self.helpers)
    }

    /// Expresses an in-bundle path relative to the executable directory,
    /// e.g. `@executable_path/../Frameworks/libfoo.dylib`.
    pub fn bundle_relative_reference(&self, path: &Path) -> String {
        executable_relative_reference(&self.executables, path)
    }

    /// Directory `@executable_path` expands to for references held by `binary`.
    ///
    /// An executable expands it against its own directory. Libraries are
    /// loaded by the bundle's executables and use the executables directory.
    pub fn executable_dir_for<'p>(&'p self, binary: &'p Path, kind: ObjectKind) -> &'p Path {
        match (kind, binary.parent()) {
            (ObjectKind::Executable, Some(dir)) => dir,
            _ => self.executables.as_path(),
        }
    }

    /// Main executable named by `Contents/Info.plist` (`CFBundleExecutable`).
    ///
    /// Returns `None` when the plist is absent, unreadable or lacks the key.
    pub fn main_executable(&self) -> Option<PathBuf> {
        let plist_path = self.root.join("Contents").join("Info.plist");
        if !plist_path.is_file() {
            return None;
        }
        match read_bundle_executable(&plist_path) {
            Ok(Some(name)) => Some(self.executables.join(name)),
            Ok(None) => {
                log::warn!("{} has no CFBundleExecutable", plist_path.display());
                None
            }
            Err(e) => {
                log::warn!("Ignoring unreadable {}: {}", plist_path.display(), e);
                None
            }
        }
    }
}

/// `@executable_path/...` form of `path` as seen from `executable_dir`.
pub fn executable_relative_reference(executable_dir: &Path, path: &Path) -> String {
    let relative = fs::relative_path(executable_dir, path);
    format!("{EXECUTABLE_PATH_TOKEN}/{}", fs::to_slash(&relative))
}

/// Expands an `@executable_path/...` reference against `executable_dir`.
pub fn expand_executable_path(reference: &str, executable_dir: &Path) -> Option<PathBuf> {
    strip_token(reference, EXECUTABLE_PATH_TOKEN).map(|rest| executable_dir.join(rest))
}

fn read_bundle_executable(plist_path: &Path) -> Result<Option<String>> {
    let value = plist::Value::from_file(plist_path)?;
    Ok(value
        .as_dictionary()
        .and_then(|dict| dict.get("CFBundleExecutable"))
        .and_then(plist::Value::as_string)
        .map(str::to_owned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::SettingsBuilder;

    const INFO_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>CFBundleExecutable</key>
    <string>Demo</string>
</dict>
</plist>
"#;

    #[tokio::test]
    async fn prepare_creates_subdirectories() {
        let temp = tempfile::tempdir().unwrap();
        let app = temp.path().join("Demo.app");
        std::fs::create_dir(&app).unwrap();
        let settings = SettingsBuilder::new().bundle_root(&app).build().unwrap();

        let layout = BundleLayout::prepare(&settings).await.unwrap();

        assert!(layout.executables().is_dir());
        assert!(layout.frameworks().is_dir());
        assert!(layout.libraries().is_dir());
        assert!(layout.helpers().is_dir());
    }

    #[test]
    fn missing_root_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let settings = SettingsBuilder::new()
            .bundle_root(temp.path().join("Nope.app"))
            .build()
            .unwrap();
        assert!(matches!(
            BundleLayout::open(&settings),
            Err(Error::BundleRootMissing(_))
        ));
    }

    #[test]
    fn bundle_relative_reference_points_from_executables() {
        let temp = tempfile::tempdir().unwrap();
        let settings = SettingsBuilder::new().bundle_root(temp.path()).build().unwrap();
        let layout = BundleLayout::open(&settings).unwrap();

        let lib = layout.libraries().join("libfoo.dylib");
        assert_eq!(
            layout.bundle_relative_reference(&lib),
            "@executable_path/../Frameworks/libfoo.dylib"
        );
        assert_eq!(
            expand_executable_path(
                "@executable_path/../Frameworks/libfoo.dylib",
                layout.executables()
            ),
            Some(layout.executables().join("../Frameworks/libfoo.dylib"))
        );
    }

    #[test]
    fn executables_outside_macos_reference_from_their_own_directory() {
        let temp = tempfile::tempdir().unwrap();
        let settings = SettingsBuilder::new().bundle_root(temp.path()).build().unwrap();
        let layout = BundleLayout::open(&settings).unwrap();
        let tool = layout.root().join("Contents/Resources/bin/tool");
        let lib = layout.libraries().join("libfoo.dylib");

        let dir = layout.executable_dir_for(&tool, ObjectKind::Executable);
        assert_eq!(dir, layout.root().join("Contents/Resources/bin"));
        assert_eq!(
            executable_relative_reference(dir, &lib),
            "@executable_path/../../Frameworks/libfoo.dylib"
        );
        assert_eq!(
            layout.executable_dir_for(&lib, ObjectKind::Library),
            layout.executables()
        );
    }

    #[test]
    fn main_executable_from_info_plist() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("Contents")).unwrap();
        std::fs::write(temp.path().join("Contents/Info.plist"), INFO_PLIST).unwrap();
        let settings = SettingsBuilder::new().bundle_root(temp.path()).build().unwrap();
        let layout = BundleLayout::open(&settings).unwrap();

        assert_eq!(
            layout.main_executable(),
            Some(layout.executables().join("Demo"))
        );
    }
}
