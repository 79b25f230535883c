//! Every file of one run, keyed by absolute path.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::audit::{Audit, AuditRecord, IssueKind, Severity};
use crate::document::TextFile;
use crate::paths::Language;
use crate::storage::walk_files;

/// A non-document file. Only ever a link destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    pub path: PathBuf,
}

/// Owns the documents and assets of a tree.
///
/// Iteration is in path order. A document is [`take`](FileDict::take)n out
/// while it is being rewritten and [`put_back`](FileDict::put_back)
/// afterwards, so the rest of the collection stays readable meanwhile.
#[derive(Debug, Default)]
pub struct FileDict {
    text_files: BTreeMap<PathBuf, TextFile>,
    asset_files: BTreeMap<PathBuf, AssetFile>,
}

impl FileDict {
    /// Reads every document under `root`. Documents that fail to load are
    /// logged, audited and left out.
    pub fn load(root: &Path, audit: &mut Audit) -> FileDict {
        let mut dict = FileDict::default();

        for path in walk_files(root) {
            let Some(mut file) = TextFile::new(path.clone()) else {
                dict.asset_files.insert(path.clone(), AssetFile { path });
                continue;
            };

            match file.read() {
                Ok(()) => {
                    dict.text_files.insert(path, file);
                }
                Err(err) => {
                    error!(file = %path.display(), "skipping document: {err}");
                    audit.push(AuditRecord::new(
                        Severity::Error,
                        IssueKind::ReadFailure,
                        &path,
                        err.to_string(),
                    ));
                }
            }
        }

        info!(
            documents = dict.text_files.len(),
            assets = dict.asset_files.len(),
            "documents loaded"
        );
        dict
    }

    pub fn insert(&mut self, file: TextFile) {
        self.text_files.insert(file.path.clone(), file);
    }

    pub fn text_file(&self, path: &Path) -> Option<&TextFile> {
        self.text_files.get(path)
    }

    pub fn text_file_mut(&mut self, path: &Path) -> Option<&mut TextFile> {
        self.text_files.get_mut(path)
    }

    pub fn is_asset(&self, path: &Path) -> bool {
        self.asset_files.contains_key(path)
    }

    pub fn text_paths(&self) -> Vec<PathBuf> {
        self.text_files.keys().cloned().collect()
    }

    pub fn text_files(&self) -> impl Iterator<Item = &TextFile> {
        self.text_files.values()
    }

    pub fn in_language(&self, language: Language) -> impl Iterator<Item = &TextFile> + '_ {
        self.text_files().filter(move |file| file.language == language)
    }

    pub fn len(&self) -> usize {
        self.text_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text_files.is_empty()
    }

    pub fn asset_count(&self) -> usize {
        self.asset_files.len()
    }

    pub fn take(&mut self, path: &Path) -> Option<TextFile> {
        self.text_files.remove(path)
    }

    pub fn put_back(&mut self, file: TextFile) {
        self.insert(file);
    }

    pub fn changed_paths(&self) -> Vec<PathBuf> {
        self.text_files()
            .filter(|file| file.changed)
            .map(|file| file.path.clone())
            .collect()
    }

    /// Writes every changed document; returns the paths written. A failed
    /// write is logged and audited and does not stop the others.
    pub fn write_changed(&mut self, audit: &mut Audit) -> Vec<PathBuf> {
        let mut written = vec![];

        for file in self.text_files.values_mut() {
            match file.write() {
                Ok(true) => written.push(file.path.clone()),
                Ok(false) => {}
                Err(err) => {
                    error!(file = %file.path.display(), "failed to write document: {err}");
                    audit.push(AuditRecord::new(
                        Severity::Error,
                        IssueKind::WriteFailure,
                        &file.path,
                        err.to_string(),
                    ));
                }
            }
        }

        info!(files = written.len(), "documents written");
        written
    }
}
