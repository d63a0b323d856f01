//! Load-command rewriting capability.
//!
//! [`Rewriter`] patches one reference (`-change`) or the library's own install
//! name (`-id`). [`InstallNameTool`] drives the system `install_name_tool`
//! with a hard timeout per invocation.

use crate::bundler::{
    builder::tool_detection::INSTALL_NAME_TOOL,
    error::{Error, Result},
};
use std::{
    io::Read,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::Duration,
};
use wait_timeout::ChildExt;

/// Patches dependency references inside binaries.
pub trait Rewriter {
    /// Replaces the reference `old` with `new` in `binary`.
    ///
    /// # Errors
    ///
    /// [`Error::Rewrite`] when the tool rejects the change,
    /// [`Error::ToolTimeout`] when it does not finish in time.
    fn change_reference(&self, binary: &Path, old: &str, new: &str) -> Result<()>;

    /// Sets the install name of the library `binary` to `new`.
    fn change_identity(&self, binary: &Path, new: &str) -> Result<()>;
}

/// [`Rewriter`] backed by `install_name_tool`.
#[derive(Clone, Debug)]
pub struct InstallNameTool {
    program: PathBuf,
    timeout: Duration,
}

impl InstallNameTool {
    /// Uses the `install_name_tool` found on `PATH`.
    pub fn new(timeout: Duration) -> Self {
        let program = INSTALL_NAME_TOOL
            .clone()
            .unwrap_or_else(|| PathBuf::from("install_name_tool"));
        Self::with_program(program, timeout)
    }

    /// Uses an explicit tool binary.
    pub fn with_program(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn run(&self, binary: &Path, args: &[&str], old: &str, new: &str) -> Result<()> {
        let rewrite_error = |reason: String| Error::Rewrite {
            binary: binary.to_path_buf(),
            old: old.to_string(),
            new: new.to_string(),
            reason,
        };

        log::debug!(
            "{} {} {}",
            self.program.display(),
            args.join(" "),
            binary.display()
        );

        let mut child = Command::new(&self.program)
            .args(args)
            .arg(binary)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| rewrite_error(format!("failed to spawn {}: {e}", self.program.display())))?;

        // Drained concurrently so a chatty tool cannot fill the pipe and stall
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut stderr = String::new();
                let _ = pipe.read_to_string(&mut stderr);
                stderr
            })
        });

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::ToolTimeout {
                    tool: self.program.display().to_string(),
                    timeout: self.timeout,
                });
            }
        };
        let stderr = stderr_reader
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(rewrite_error(format!(
                "exit code {:?}: {}",
                status.code(),
                stderr.trim()
            )));
        }

        let length = std::fs::metadata(binary).map(|m| m.len()).unwrap_or(0);
        if length == 0 {
            return Err(rewrite_error("binary is empty after rewrite".to_string()));
        }

        Ok(())
    }
}

impl Rewriter for InstallNameTool {
    fn change_reference(&self, binary: &Path, old: &str, new: &str) -> Result<()> {
        self.run(binary, &["-change", old, new], old, new)
    }

    fn change_identity(&self, binary: &Path, new: &str) -> Result<()> {
        self.run(binary, &["-id", new], "", new)
    }
}
