//! Outcome of one relocation run.

use super::resolver::LibraryKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Which stage a recorded failure came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Inspection,
    Materialization,
    Rewrite,
}

/// A recoverable per-node or per-edge failure.
#[derive(Clone, Debug, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub binary: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
    pub message: String,
}

/// A dependency copied into the bundle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CopyRecord {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub kind: LibraryKind,
}

/// A reference rewritten inside a binary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RewriteRecord {
    pub binary: PathBuf,
    pub old: String,
    pub new: String,
}

/// A library whose own install name was rewritten.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IdentityRecord {
    pub binary: PathBuf,
    pub identity: String,
}

/// A reference that could not be mapped to a file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnresolvedRecord {
    pub binary: PathBuf,
    pub reference: String,
}

/// Overall verdict of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// Every reachable dependency is bundled and rewritten.
    Success,
    /// Finished with unresolved references or tolerated failures.
    Partial,
    /// Failure ratio exceeded the configured maximum.
    Failed,
}

impl RunStatus {
    /// Process exit code for this status.
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Success => 0,
            RunStatus::Partial => 2,
            RunStatus::Failed => 1,
        }
    }
}

/// Everything a relocation run did, in the order it happened.
#[derive(Clone, Debug, Serialize)]
pub struct RelocationReport {
    pub bundle_root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Binaries visited, each counted once.
    pub visited: usize,
    pub copies: Vec<CopyRecord>,
    pub rewrites: Vec<RewriteRecord>,
    pub identities: Vec<IdentityRecord>,
    /// References left alone because they belong to the OS.
    pub system_references: usize,
    pub unresolved: Vec<UnresolvedRecord>,
    pub failures: Vec<Failure>,
    /// Inspections, copies and rewrites attempted; the failure ratio denominator.
    pub attempted: usize,
}

impl RelocationReport {
    /// Starts an empty report for `bundle_root`.
    pub fn new(bundle_root: &Path) -> Self {
        Self {
            bundle_root: bundle_root.to_path_buf(),
            started_at: Utc::now(),
            finished_at: None,
            visited: 0,
            copies: Vec::new(),
            rewrites: Vec::new(),
            identities: Vec::new(),
            system_references: 0,
            unresolved: Vec::new(),
            failures: Vec::new(),
            attempted: 0,
        }
    }

    pub(crate) fn record_copy(&mut self, source: &Path, destination: &Path, kind: LibraryKind) {
        self.copies.push(CopyRecord {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            kind,
        });
    }

    pub(crate) fn record_rewrite(&mut self, binary: &Path, old: &str, new: &str) {
        self.rewrites.push(RewriteRecord {
            binary: binary.to_path_buf(),
            old: old.to_string(),
            new: new.to_string(),
        });
    }

    pub(crate) fn record_identity(&mut self, binary: &Path, identity: &str) {
        self.identities.push(IdentityRecord {
            binary: binary.to_path_buf(),
            identity: identity.to_string(),
        });
    }

    pub(crate) fn record_unresolved(&mut self, binary: &Path, reference: &str) {
        self.unresolved.push(UnresolvedRecord {
            binary: binary.to_path_buf(),
            reference: reference.to_string(),
        });
    }

    pub(crate) fn record_failure(
        &mut self,
        kind: FailureKind,
        binary: &Path,
        reference: Option<&str>,
        destination: Option<&Path>,
        message: impl Into<String>,
    ) {
        self.failures.push(Failure {
            kind,
            binary: binary.to_path_buf(),
            reference: reference.map(str::to_owned),
            destination: destination.map(Path::to_path_buf),
            message: message.into(),
        });
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Recorded failures over attempted operations; zero when nothing was attempted.
    pub fn failure_ratio(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.failures.len() as f64 / self.attempted as f64
        }
    }

    /// Verdict for this report given the tolerated failure ratio.
    ///
    /// Unresolved references make a run partial but do not count toward the ratio.
    pub fn status(&self, max_failure_ratio: f64) -> RunStatus {
        if self.failure_ratio() > max_failure_ratio {
            RunStatus::Failed
        } else if !self.failures.is_empty() || !self.unresolved.is_empty() {
            RunStatus::Partial
        } else {
            RunStatus::Success
        }
    }

    /// Logs a one-screen summary.
    pub fn log_summary(&self) {
        log::info!(
            "Visited {} binaries: {} copied, {} references rewritten, {} identities set, {} system references skipped",
            self.visited,
            self.copies.len(),
            self.rewrites.len(),
            self.identities.len(),
            self.system_references
        );
        for unresolved in &self.unresolved {
            log::warn!(
                "Unresolved: `{}` needed by {}",
                unresolved.reference,
                unresolved.binary.display()
            );
        }
        if !self.failures.is_empty() {
            log::warn!(
                "{} of {} operations failed ({:.1}%)",
                self.failures.len(),
                self.attempted,
                self.failure_ratio() * 100.0
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> RelocationReport {
        RelocationReport::new(Path::new("/Apps/Demo.app"))
    }

    #[test]
    fn clean_run_succeeds() {
        let mut report = report();
        report.attempted = 4;
        assert_eq!(report.status(0.25), RunStatus::Success);
        assert_eq!(report.status(0.25).exit_code(), 0);
    }

    #[test]
    fn unresolved_references_make_a_run_partial() {
        let mut report = report();
        report.attempted = 4;
        report.record_unresolved(Path::new("/Apps/Demo.app/Contents/MacOS/Demo"), "@rpath/libgone.dylib");
        assert_eq!(report.status(0.25), RunStatus::Partial);
        assert_eq!(report.failure_ratio(), 0.0);
    }

    #[test]
    fn failures_above_the_ratio_fail_the_run() {
        let mut report = report();
        report.attempted = 4;
        let binary = Path::new("/Apps/Demo.app/Contents/MacOS/Demo");
        report.record_failure(FailureKind::Rewrite, binary, Some("a"), None, "boom");
        assert_eq!(report.status(0.25), RunStatus::Partial);

        report.record_failure(FailureKind::Rewrite, binary, Some("b"), None, "boom");
        assert_eq!(report.status(0.25), RunStatus::Failed);
        assert_eq!(report.status(0.25).exit_code(), 1);
    }

    #[test]
    fn empty_run_has_zero_ratio() {
        assert_eq!(report().failure_ratio(), 0.0);
        assert_eq!(report().status(0.0), RunStatus::Success);
    }

    #[test]
    fn serializes_to_json() {
        let mut report = report();
        report.record_copy(
            Path::new("/opt/lib/libz.dylib"),
            Path::new("/Apps/Demo.app/Contents/Frameworks/libz.dylib"),
            LibraryKind::PlainLibrary,
        );
        report.finish();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["copies"][0]["kind"], "plain-library");
        assert!(json["finished_at"].is_string());
    }
}
