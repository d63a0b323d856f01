//! Shared fixtures for integration tests.
//!
//! Binaries are plain text files in a tiny scripted format so tests run on any
//! host without a Mach-O toolchain:
//!
//! ```text
//! #!macho dylib
//! id @rpath/libfoo.dylib
//! dep /opt/lib/libbar.dylib
//! rpath @executable_path/../Frameworks
//! ```
//!
//! [`ScriptedToolchain`] implements both the inspector and the rewriter over
//! that format and records every rewrite it performs.

#![allow(dead_code)]

use kodegen_bundler_relocate::bundler::{
    Error, Inspection, Inspector, ObjectKind, Result, Rewriter, Settings, SettingsBuilder,
};
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tempfile::TempDir;

const HEADER: &str = "#!macho ";
const BROKEN: &str = "#!broken";

/// Parsed scripted binary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FakeObject {
    pub kind: ObjectKind,
    pub id: Option<String>,
    pub deps: Vec<String>,
    pub rpaths: Vec<String>,
}

impl FakeObject {
    pub fn dylib(id: Option<&str>, deps: &[&str]) -> Self {
        Self {
            kind: ObjectKind::Library,
            id: id.map(str::to_owned),
            deps: deps.iter().map(|d| d.to_string()).collect(),
            rpaths: Vec::new(),
        }
    }

    pub fn executable(deps: &[&str]) -> Self {
        Self {
            kind: ObjectKind::Executable,
            id: None,
            deps: deps.iter().map(|d| d.to_string()).collect(),
            rpaths: Vec::new(),
        }
    }

    pub fn with_rpaths(mut self, rpaths: &[&str]) -> Self {
        self.rpaths = rpaths.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn parse(text: &str) -> Option<Self> {
        let mut lines = text.lines();
        let kind = match lines.next()?.strip_prefix(HEADER)? {
            "executable" => ObjectKind::Executable,
            "dylib" => ObjectKind::Library,
            _ => return None,
        };
        let mut object = Self {
            kind,
            id: None,
            deps: Vec::new(),
            rpaths: Vec::new(),
        };
        for line in lines {
            if let Some(id) = line.strip_prefix("id ") {
                object.id = Some(id.to_string());
            } else if let Some(dep) = line.strip_prefix("dep ") {
                object.deps.push(dep.to_string());
            } else if let Some(rpath) = line.strip_prefix("rpath ") {
                object.rpaths.push(rpath.to_string());
            }
        }
        Some(object)
    }

    pub fn render(&self) -> String {
        let kind = match self.kind {
            ObjectKind::Executable => "executable",
            _ => "dylib",
        };
        let mut text = format!("{HEADER}{kind}\n");
        if let Some(id) = &self.id {
            text.push_str(&format!("id {id}\n"));
        }
        for dep in &self.deps {
            text.push_str(&format!("dep {dep}\n"));
        }
        for rpath in &self.rpaths {
            text.push_str(&format!("rpath {rpath}\n"));
        }
        text
    }

    pub fn read(path: &Path) -> Self {
        let text = std::fs::read_to_string(path).unwrap();
        Self::parse(&text).unwrap_or_else(|| panic!("{} is not a scripted object", path.display()))
    }
}

/// One rewrite performed by the scripted toolchain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Change {
        binary: PathBuf,
        old: String,
        new: String,
    },
    Id {
        binary: PathBuf,
        new: String,
    },
}

/// Inspector and rewriter over the scripted text format.
#[derive(Clone, Debug, Default)]
pub struct ScriptedToolchain {
    calls: Arc<Mutex<Vec<Call>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl ScriptedToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every rewrite of a binary with this file name fail.
    pub fn fail_rewrites_of(&self, file_name: &str) {
        self.failing.lock().unwrap().push(file_name.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn identity_calls_for(&self, binary: &Path) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Id { binary: b, .. } if b == binary))
            .count()
    }

    fn check_failure(&self, binary: &Path, old: &str, new: &str) -> Result<()> {
        let name = binary
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.failing.lock().unwrap().contains(&name) {
            return Err(Error::Rewrite {
                binary: binary.to_path_buf(),
                old: old.to_string(),
                new: new.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    fn load(binary: &Path) -> Result<FakeObject> {
        let text = std::fs::read_to_string(binary)?;
        FakeObject::parse(&text).ok_or_else(|| Error::GenericError(format!("{} is not an object", binary.display())))
    }
}

impl Inspector for ScriptedToolchain {
    fn inspect(&self, path: &Path) -> Result<Inspection> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::Inspection {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if text.starts_with(BROKEN) {
            return Err(Error::Inspection {
                path: path.to_path_buf(),
                reason: "malformed load commands".to_string(),
            });
        }
        Ok(match FakeObject::parse(&text) {
            Some(object) => Inspection {
                kind: object.kind,
                identity: object.id,
                dependencies: object.deps,
                search_paths: object.rpaths,
            },
            None => Inspection::not_relocatable(),
        })
    }
}

impl Rewriter for ScriptedToolchain {
    fn change_reference(&self, binary: &Path, old: &str, new: &str) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Change {
            binary: binary.to_path_buf(),
            old: old.to_string(),
            new: new.to_string(),
        });
        self.check_failure(binary, old, new)?;

        let mut object = Self::load(binary)?;
        let Some(slot) = object.deps.iter_mut().find(|dep| *dep == old) else {
            return Err(Error::Rewrite {
                binary: binary.to_path_buf(),
                old: old.to_string(),
                new: new.to_string(),
                reason: "no such reference".to_string(),
            });
        };
        *slot = new.to_string();
        std::fs::write(binary, object.render())?;
        Ok(())
    }

    fn change_identity(&self, binary: &Path, new: &str) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Id {
            binary: binary.to_path_buf(),
            new: new.to_string(),
        });
        self.check_failure(binary, "", new)?;

        let mut object = Self::load(binary)?;
        object.id = Some(new.to_string());
        std::fs::write(binary, object.render())?;
        Ok(())
    }
}

/// A `Demo.app` bundle plus an `external` directory standing in for the
/// build machine's library locations. All paths are canonical.
pub struct TestBundle {
    _temp: TempDir,
    pub app: PathBuf,
    pub external: PathBuf,
}

impl TestBundle {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let root = std::fs::canonicalize(temp.path()).unwrap();
        let app = root.join("Demo.app");
        let external = root.join("external");
        std::fs::create_dir_all(app.join("Contents/MacOS")).unwrap();
        std::fs::create_dir_all(&external).unwrap();
        std::fs::write(
            app.join("Contents/Info.plist"),
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>CFBundleExecutable</key>
    <string>Demo</string>
</dict>
</plist>
"#,
        )
        .unwrap();
        Self {
            _temp: temp,
            app,
            external,
        }
    }

    pub fn macos(&self) -> PathBuf {
        self.app.join("Contents/MacOS")
    }

    pub fn frameworks(&self) -> PathBuf {
        self.app.join("Contents/Frameworks")
    }

    pub fn helpers(&self) -> PathBuf {
        self.app.join("Contents/Helpers")
    }

    /// Writes an executable into `Contents/MacOS`.
    pub fn executable(&self, name: &str, object: FakeObject) -> PathBuf {
        let path = self.macos().join(name);
        write_object(&path, &object, 0o755);
        path
    }

    /// Writes a library outside the bundle.
    pub fn external_library(&self, relative: &str, object: FakeObject) -> PathBuf {
        let path = self.external.join(relative);
        write_object(&path, &object, 0o644);
        path
    }

    /// Settings with no host fallback directories.
    pub fn settings(&self) -> Settings {
        self.settings_with(|builder| builder)
    }

    pub fn settings_with(&self, f: impl FnOnce(SettingsBuilder) -> SettingsBuilder) -> Settings {
        f(SettingsBuilder::new().bundle_root(&self.app).search_dirs(Vec::new()))
            .build()
            .unwrap()
    }
}

/// Writes `object` to `path` with the given permission bits.
pub fn write_object(path: &Path, object: &FakeObject, mode: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, object.render()).unwrap();
    set_mode(path, mode);
}

#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).unwrap();
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) {}

/// `@executable_path` form of a file in the private frameworks directory.
pub fn bundled(relative: &str) -> String {
    format!("@executable_path/../Frameworks/{relative}")
}
