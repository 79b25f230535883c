//! One full repair run over a documentation tree.

use std::fmt;
use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing::{debug, info};

use crate::anchors::AnchorInspector;
use crate::audit::{Audit, AuditSummary};
use crate::config::Settings;
use crate::file_dict::FileDict;
use crate::fixer::LinkFixer;
use crate::paths::Language;
use crate::resolver::LinkInspector;
use crate::storage::Storage;

/// What a run did. `changed` lists the documents that were (or, in a dry
/// run, would have been) rewritten.
#[derive(Debug)]
pub struct RepairReport {
    pub root: PathBuf,
    pub dry_run: bool,
    pub documents: usize,
    pub links: usize,
    pub changed: Vec<PathBuf>,
    pub audit: Audit,
}

impl RepairReport {
    pub fn summary(&self) -> AuditSummary {
        self.audit.summary()
    }
}

impl fmt::Display for RepairReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary();
        let verb = if self.dry_run { "would change" } else { "changed" };

        write!(
            f,
            "{} document(s), {} link(s): {verb} {} file(s) ({} line rewrite(s)), {} warning(s), {} error(s)",
            self.documents,
            self.links,
            self.changed.len(),
            summary.rewrites,
            summary.warnings,
            summary.errors
        )
    }
}

/// Builds the index, renames colliding anchors, then fixes and resolves the
/// links of every document in path order. Files are written at the end,
/// unless `settings.dry_run`.
///
/// Only an invariant violation in the fixer fails the run; nothing is
/// written in that case.
pub fn link_repair(settings: &Settings) -> anyhow::Result<RepairReport> {
    let root = settings.target.as_path();
    if !root.is_dir() {
        bail!("{} is not a directory", root.display());
    }

    info!(root = %root.display(), dry_run = settings.dry_run, "link repair started");

    let mut audit = Audit::new(root, settings.dry_run);
    let storage = Storage::build(root, Some(settings.components_dir.as_str()));
    let files = FileDict::load(root, &mut audit);

    repair_files(settings, &storage, files, audit)
}

/// The stages of a run over an already loaded collection.
fn repair_files(
    settings: &Settings,
    storage: &Storage,
    mut files: FileDict,
    mut audit: Audit,
) -> anyhow::Result<RepairReport> {
    let anchors =
        AnchorInspector::new(settings.language_policy).skip_english(settings.skip_english);
    if settings.check_anchors {
        anchors.inspect(&mut files, &mut audit);
    }

    let fixer = LinkFixer::new();
    let mut links = 0;

    for path in files.text_paths() {
        let Some(mut file) = files.take(&path) else {
            continue;
        };

        if settings.skip_english && file.language == Language::English {
            debug!(file = %path.display(), "skipping English document");
            files.put_back(file);
            continue;
        }

        links += file.links.len();
        anchors.check_internal_links(&file, &mut audit);

        fixer.fix_file(&mut file, &mut audit).with_context(|| {
            format!("Link repair aborted in {}", path.display())
        })?;
        LinkInspector::new(storage, &files).inspect_file(&mut file, &mut audit);

        files.put_back(file);
    }

    let changed = match settings.dry_run {
        true => files.changed_paths(),
        false => files.write_changed(&mut audit),
    };

    if settings.keep_audit {
        audit.write_json(&settings.audit_file)?;
        info!(path = %settings.audit_file.display(), "audit written");
    }

    let report = RepairReport {
        root: settings.target.clone(),
        dry_run: settings.dry_run,
        documents: files.len(),
        links,
        changed,
        audit,
    };
    info!("{report}");

    Ok(report)
}
