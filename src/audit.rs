//! Per-run record of every issue found and every fix applied.
//!
//! Everything the repair stages log at warning or error level is also pushed
//! here, so a run can be reviewed after the fact from the JSON artifact.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::document::LineChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A document could not be loaded and was skipped
    ReadFailure,
    /// A changed document could not be written back
    WriteFailure,
    /// Malformed link text repaired by the fixer
    LinkDefect,
    /// No file matches the link
    LinkNotFound,
    /// Link rewritten to its canonical form
    LinkRewritten,
    /// Anchor replaced by a known anchor of the destination
    AnchorRepaired,
    /// Anchor replaced by the not-found sentinel
    AnchorNotFound,
    /// Anchor declared twice in one document
    DuplicateAnchor,
    /// Anchor shared across documents, renamed
    AnchorRenamed,
    /// Same-document reference to an undeclared anchor
    DanglingInternalLink,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub severity: Severity,
    pub kind: IssueKind,
    pub file: PathBuf,
    /// One-based, as editors show it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl AuditRecord {
    pub fn new(severity: Severity, kind: IssueKind, file: &Path, message: impl Into<String>) -> Self {
        AuditRecord {
            severity,
            kind,
            file: file.to_path_buf(),
            line: None,
            message: message.into(),
            before: None,
            after: None,
        }
    }

    /// `line` is zero-based.
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line + 1);
        self
    }

    pub fn with_change(mut self, change: &LineChange) -> Self {
        self.line = Some(change.line + 1);
        self.before = Some(change.before.trim_end().to_string());
        self.after = Some(change.after.trim_end().to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub info: usize,
    pub warnings: usize,
    pub errors: usize,
    /// Records that carry an applied line rewrite.
    pub rewrites: usize,
}

#[derive(Debug, Clone)]
pub struct Audit {
    started_at: DateTime<Local>,
    root: PathBuf,
    dry_run: bool,
    records: Vec<AuditRecord>,
}

#[derive(Serialize)]
struct Artifact<'a> {
    started_at: &'a DateTime<Local>,
    root: &'a Path,
    dry_run: bool,
    summary: AuditSummary,
    records: &'a [AuditRecord],
}

impl Audit {
    pub fn new(root: &Path, dry_run: bool) -> Self {
        Audit {
            started_at: Local::now(),
            root: root.to_path_buf(),
            dry_run,
            records: vec![],
        }
    }

    pub fn push(&mut self, record: AuditRecord) {
        self.records.push(record);
    }

    /// One record per applied change.
    pub fn push_changes(
        &mut self,
        severity: Severity,
        kind: IssueKind,
        file: &Path,
        message: &str,
        changes: &[LineChange],
    ) {
        for change in changes {
            self.push(AuditRecord::new(severity, kind, file, message).with_change(change));
        }
    }

    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.records.iter().filter(|record| record.kind == kind).count()
    }

    pub fn summary(&self) -> AuditSummary {
        self.records.iter().fold(AuditSummary::default(), |mut summary, record| {
            match record.severity {
                Severity::Info => summary.info += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Error => summary.errors += 1,
            }
            if record.after.is_some() {
                summary.rewrites += 1;
            }
            summary
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&Artifact {
            started_at: &self.started_at,
            root: &self.root,
            dry_run: self.dry_run,
            summary: self.summary(),
            records: &self.records,
        })
    }

    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let json = self.to_json().context("Failed to serialise audit")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write audit to {}", path.display()))?;
        Ok(())
    }
}
