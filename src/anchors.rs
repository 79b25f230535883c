//! Duplicate-anchor detection and renaming.
//!
//! Runs over the whole collection before any link is resolved, so that the
//! resolver already sees the renamed anchors.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use itertools::Itertools;
use tracing::{error, info, warn};

use crate::audit::{Audit, AuditRecord, IssueKind, Severity};
use crate::config::LanguagePolicy;
use crate::document::TextFile;
use crate::file_dict::FileDict;
use crate::paths::Language;

fn sanitize(name: &str) -> String {
    name.to_lowercase()
        .trim_start_matches('_')
        .replace(['_', '.'], "-")
}

/// Suffix a colliding anchor gets in `path`: the file stem, lowercased, with
/// a leading `_` dropped and `_`/`.` turned into `-`.
pub fn disambiguator(path: &Path) -> String {
    sanitize(
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default(),
    )
}

/// [`disambiguator`] qualified by the parent directory, for files whose
/// plain disambiguator collides (two `_index` files, say).
pub fn qualified_disambiguator(path: &Path) -> String {
    let parent = path
        .parent()
        .and_then(|parent| parent.file_name())
        .and_then(|name| name.to_str())
        .map(sanitize)
        .unwrap_or_default();

    match parent.is_empty() {
        true => disambiguator(path),
        false => format!("{parent}-{}", disambiguator(path)),
    }
}

/// Both renamed forms an anchor of `path` can have taken, most likely first.
pub fn renamed_forms(anchor: &str, path: &Path) -> [String; 2] {
    [
        format!("{anchor}-{}", disambiguator(path)),
        format!("{anchor}-{}", qualified_disambiguator(path)),
    ]
}

#[derive(Debug, Clone, Copy)]
pub struct AnchorInspector {
    policy: LanguagePolicy,
    skip_english: bool,
}

impl AnchorInspector {
    pub fn new(policy: LanguagePolicy) -> Self {
        AnchorInspector {
            policy,
            skip_english: false,
        }
    }

    /// English documents are neither reported on nor renamed.
    pub fn skip_english(mut self, skip: bool) -> Self {
        self.skip_english = skip;
        self
    }

    fn inspects(&self, file: &TextFile) -> bool {
        !(self.skip_english && file.language == Language::English)
    }

    /// Groups of documents whose anchors share one namespace.
    fn partitions(&self, files: &FileDict) -> Vec<Vec<PathBuf>> {
        let paths = |language: Language| {
            files
                .in_language(language)
                .filter(|file| self.inspects(file))
                .map(|file| file.path.clone())
                .collect_vec()
        };

        match self.policy {
            LanguagePolicy::Separate => vec![paths(Language::Default), paths(Language::English)],
            LanguagePolicy::DefaultOnly => vec![paths(Language::Default)],
            LanguagePolicy::Merged => vec![paths(Language::Default)
                .into_iter()
                .chain(paths(Language::English))
                .collect()],
        }
    }

    /// Reports anchors declared twice within a document, then renames every
    /// anchor declared by more than one document of a partition.
    pub fn inspect(&self, files: &mut FileDict, audit: &mut Audit) {
        for file in files.text_files().filter(|file| self.inspects(file)) {
            report_within_file_duplicates(file, audit);
        }

        let mut renamed = 0;
        for partition in self.partitions(files) {
            renamed += rename_collisions(files, &partition, audit);
        }

        info!(renamed, policy = ?self.policy, "anchor collisions resolved");
    }

    /// Warns about same-document references to anchors the document lacks.
    pub fn check_internal_links(&self, file: &TextFile, audit: &mut Audit) {
        for link in file.dangling_internal_links() {
            warn!(
                file = %file.path.display(),
                line = link.line + 1,
                anchor = %link.anchor,
                "internal link to an undeclared anchor"
            );
            audit.push(
                AuditRecord::new(
                    Severity::Warning,
                    IssueKind::DanglingInternalLink,
                    &file.path,
                    format!("no anchor `{}` in this document", link.anchor),
                )
                .at_line(link.line),
            );
        }
    }
}

fn report_within_file_duplicates(file: &TextFile, audit: &mut Audit) {
    for (anchor, lines) in file.duplicate_anchors() {
        error!(
            file = %file.path.display(),
            anchor = %anchor,
            lines = ?lines.iter().map(|line| line + 1).collect_vec(),
            "anchor declared more than once"
        );
        for line in lines.into_iter().skip(1) {
            audit.push(
                AuditRecord::new(
                    Severity::Error,
                    IssueKind::DuplicateAnchor,
                    &file.path,
                    format!("anchor `{anchor}` is already declared in this document"),
                )
                .at_line(line),
            );
        }
    }
}

fn rename_collisions(files: &mut FileDict, partition: &[PathBuf], audit: &mut Audit) -> usize {
    let mut declared_in: BTreeMap<String, BTreeSet<PathBuf>> = BTreeMap::new();
    for path in partition {
        let Some(file) = files.text_file(path) else {
            continue;
        };
        for anchor in &file.anchors {
            declared_in
                .entry(anchor.clone())
                .or_default()
                .insert(path.clone());
        }
    }

    let mut renamed = 0;
    for (anchor, paths) in declared_in.into_iter().filter(|(_, paths)| paths.len() > 1) {
        let plain = paths.iter().map(|path| disambiguator(path)).collect_vec();
        let clashing = plain.iter().duplicates().cloned().collect::<BTreeSet<_>>();

        for (path, plain) in paths.iter().zip(plain) {
            let suffix = match clashing.contains(&plain) {
                true => qualified_disambiguator(path),
                false => plain,
            };
            let new = format!("{anchor}-{suffix}");

            let Some(file) = files.text_file_mut(path) else {
                continue;
            };
            let changes = file.rename_anchor(&anchor, &new);
            warn!(
                file = %path.display(),
                anchor = %anchor,
                renamed = %new,
                "anchor shared with other documents renamed"
            );
            audit.push_changes(
                Severity::Warning,
                IssueKind::AnchorRenamed,
                path,
                &format!("anchor `{anchor}` renamed to `{new}`"),
                &changes,
            );
            renamed += 1;
        }
    }

    renamed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_docs, write_file};

    fn load(setup: impl FnOnce(&Path)) -> (tempfile::TempDir, PathBuf, FileDict, Audit) {
        let (temp_dir, docs_dir) = create_test_docs(setup);
        let mut audit = Audit::new(&docs_dir, true);
        let files = FileDict::load(&docs_dir, &mut audit);
        (temp_dir, docs_dir, files, audit)
    }

    #[test]
    fn disambiguator_forms() {
        assert_eq!(disambiguator(Path::new("/d/Getting_Started.md")), "getting-started");
        assert_eq!(disambiguator(Path::new("/d/_index.md")), "index");
        assert_eq!(disambiguator(Path::new("/d/page.en.md")), "page-en");
        assert_eq!(
            qualified_disambiguator(Path::new("/d/guide/_index.md")),
            "guide-index"
        );
    }

    #[test]
    fn shared_anchor_is_renamed_in_every_document() {
        let (_temp_dir, docs_dir, mut files, mut audit) = load(|dir| {
            write_file(dir, "a/alpha.md", "## Overview {#overview}\n[up](#overview)\n");
            write_file(dir, "b/beta.md", "## Overview {#overview}\n");
            write_file(dir, "c/gamma.md", "## Other {#other}\n");
        });

        AnchorInspector::new(LanguagePolicy::Separate).inspect(&mut files, &mut audit);

        let alpha = files.text_file(&docs_dir.join("a/alpha.md")).unwrap();
        assert_eq!(alpha.content[0], "## Overview {#overview-alpha}\n");
        assert_eq!(alpha.content[1], "[up](#overview-alpha)\n");

        let beta = files.text_file(&docs_dir.join("b/beta.md")).unwrap();
        assert!(beta.anchors.contains("overview-beta"));

        let gamma = files.text_file(&docs_dir.join("c/gamma.md")).unwrap();
        assert!(!gamma.changed);
        assert_eq!(audit.count(IssueKind::AnchorRenamed), 3);
    }

    #[test]
    fn clashing_stems_are_qualified_by_parent() {
        let (_temp_dir, docs_dir, mut files, mut audit) = load(|dir| {
            write_file(dir, "guide/_index.md", "{#intro}\n");
            write_file(dir, "api/_index.md", "{#intro}\n");
        });

        AnchorInspector::new(LanguagePolicy::Separate).inspect(&mut files, &mut audit);

        let guide = files.text_file(&docs_dir.join("guide/_index.md")).unwrap();
        let api = files.text_file(&docs_dir.join("api/_index.md")).unwrap();
        assert!(guide.anchors.contains("intro-guide-index"));
        assert!(api.anchors.contains("intro-api-index"));
    }

    #[test]
    fn language_policy_partitions() {
        let setup = |dir: &Path| {
            write_file(dir, "a/page.md", "{#setup}\n");
            write_file(dir, "a/page.en.md", "{#setup}\n");
        };

        for policy in [LanguagePolicy::Separate, LanguagePolicy::DefaultOnly] {
            let (_temp_dir, _docs_dir, mut files, mut audit) = load(setup);
            AnchorInspector::new(policy).inspect(&mut files, &mut audit);
            assert!(files.changed_paths().is_empty(), "{policy:?}");
        }

        let (_temp_dir, docs_dir, mut files, mut audit) = load(setup);
        AnchorInspector::new(LanguagePolicy::Merged).inspect(&mut files, &mut audit);

        let english = files.text_file(&docs_dir.join("a/page.en.md")).unwrap();
        assert!(english.anchors.contains("setup-page-en"));
        let default = files.text_file(&docs_dir.join("a/page.md")).unwrap();
        assert!(default.anchors.contains("setup-page"));
    }

    #[test]
    fn skipped_english_documents_are_never_renamed() {
        let setup = |dir: &Path| {
            write_file(dir, "a/one.en.md", "{#intro}\n");
            write_file(dir, "b/two.en.md", "{#intro}\n{#intro}\n");
            write_file(dir, "c/three.md", "{#intro}\n");
        };

        for policy in [LanguagePolicy::Separate, LanguagePolicy::Merged] {
            let (_temp_dir, docs_dir, mut files, mut audit) = load(setup);
            AnchorInspector::new(policy)
                .skip_english(true)
                .inspect(&mut files, &mut audit);

            assert!(files.changed_paths().is_empty(), "{policy:?}");
            assert!(audit.records().is_empty(), "{policy:?}");
            let english = files.text_file(&docs_dir.join("a/one.en.md")).unwrap();
            assert_eq!(english.content[0], "{#intro}\n");
        }
    }

    #[test]
    fn within_file_duplicates_are_reported_not_renamed() {
        let (_temp_dir, docs_dir, mut files, mut audit) = load(|dir| {
            write_file(dir, "page.md", "{#twice}\ntext\n{#twice}\n");
        });

        AnchorInspector::new(LanguagePolicy::Separate).inspect(&mut files, &mut audit);

        assert_eq!(audit.count(IssueKind::DuplicateAnchor), 1);
        assert_eq!(audit.records()[0].line, Some(3));
        assert!(!files.text_file(&docs_dir.join("page.md")).unwrap().changed);
    }

    #[test]
    fn dangling_internal_links_warn() {
        let (_temp_dir, docs_dir, files, mut audit) = load(|dir| {
            write_file(dir, "page.md", "{#here}\n[a](#here) [b](#gone)\n");
        });

        let file = files.text_file(&docs_dir.join("page.md")).unwrap();
        AnchorInspector::new(LanguagePolicy::Separate).check_internal_links(file, &mut audit);

        assert_eq!(audit.count(IssueKind::DanglingInternalLink), 1);
        assert_eq!(audit.records()[0].line, Some(2));
    }
}
