//! The document index: every file of the tree, reachable by a short name.
//!
//! Links are often written against a name rather than a correct relative
//! path (`../install/`, `setup.md`). The index maps those names back to
//! files even when several files share a stem, by qualifying a name with its
//! parent (and grandparent) directory only where the shorter form collides.

mod table;

pub use table::{disambiguate, NameSource, NameTable, TableKind};

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use once_cell::unsync::OnceCell;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::document::Dialect;
use crate::paths::{self, Language};

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// All regular files under `root`, hidden entries skipped, sorted by name.
pub fn walk_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry))
        .flatten()
        .filter(|entry| entry.file_type().is_file())
        .map(DirEntry::into_path)
        .collect()
}

fn classify(path: &Path) -> TableKind {
    if !paths::is_document(path) {
        return TableKind::Asset;
    }

    let stem = paths::bare_stem(path);
    if paths::is_dir_index_stem(&stem) {
        TableKind::DirIndex
    } else if paths::is_dir_index_underscored_stem(&stem) {
        TableKind::DirIndexUnderscored
    } else {
        TableKind::Document
    }
}

/// Path parts a file's index names are built from, relative to `root`.
fn name_parts(root: &Path, path: &Path, kind: TableKind) -> Vec<String> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut parts = relative
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .filter_map(|component| component.as_os_str().to_str())
        .map(str::to_string)
        .collect_vec();

    match kind {
        TableKind::DirIndex | TableKind::DirIndexUnderscored => {}
        TableKind::Asset => parts.extend(
            path.file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string),
        ),
        TableKind::Document => parts.push(paths::bare_stem(path)),
    }

    parts
}

type GroupKey = (TableKind, Language, Option<Dialect>);

/// The index for one tree.
#[derive(Debug)]
pub struct Storage {
    root: PathBuf,
    tables: HashMap<(TableKind, Language), NameTable>,
    components: BTreeMap<String, ComponentStorage>,
}

impl Storage {
    /// Walks `root` once. With `components_dir`, every immediate subdirectory
    /// of `<root>/<components_dir>` holding a directory-index file gets its own
    /// nested index, built on first use.
    pub fn build(root: &Path, components_dir: Option<&str>) -> Storage {
        let files = walk_files(root);

        let groups = files
            .iter()
            .map(|path| {
                let kind = classify(path);
                let language = match kind {
                    TableKind::Asset => Language::Default,
                    _ => paths::language_of(path),
                };
                let key: GroupKey = (kind, language, Dialect::from_path(path));
                let source = NameSource {
                    path: path.clone(),
                    parts: name_parts(root, path, kind),
                };
                (key, source)
            })
            .filter(|(_, source)| !source.parts.is_empty())
            .into_group_map();

        let mut tables: HashMap<(TableKind, Language), NameTable> = HashMap::new();
        // sorted so that ambiguity diagnostics come out in a stable order
        for ((kind, language, _), sources) in groups.into_iter().sorted_by_key(|(key, _)| *key) {
            let table = tables.entry((kind, language)).or_default();
            for (name, path) in disambiguate(&sources) {
                table.insert(name, path);
            }
        }

        let components = components_dir
            .map(|dir| ComponentStorage::discover(&root.join(dir)))
            .unwrap_or_default();

        let storage = Storage {
            root: root.to_path_buf(),
            tables,
            components,
        };

        info!(
            root = %root.display(),
            files = files.len(),
            names = storage.tables.values().map(NameTable::len).sum::<usize>(),
            components = storage.components.len(),
            "document index built"
        );

        storage
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn table(&self, kind: TableKind, language: Language) -> Option<&NameTable> {
        self.tables.get(&(kind, language))
    }

    pub fn lookup(&self, kind: TableKind, language: Language, name: &str) -> Option<&Path> {
        self.table(kind, language)?.get(name)
    }

    /// First hit over tables (in [`TableKind::PROBE_ORDER`]), then names,
    /// then `language` before the default language.
    pub fn find(&self, names: &[String], language: Language) -> Option<PathBuf> {
        let languages = [language, Language::Default].into_iter().unique().collect_vec();

        TableKind::PROBE_ORDER.iter().find_map(|kind| {
            names.iter().find_map(|name| {
                languages.iter().find_map(|language| {
                    let found = self.lookup(*kind, *language, name)?;
                    debug!(name = %name, table = ?kind, path = %found.display(), "index hit");
                    Some(found.to_path_buf())
                })
            })
        })
    }

    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// The nested index of the component `path` lives in, if any.
    pub fn component_for(&self, path: &Path) -> Option<&Storage> {
        self.components
            .values()
            .find(|component| path.starts_with(&component.root))
            .map(ComponentStorage::storage)
    }
}

/// The index of one `components/<name>` subtree.
#[derive(Debug)]
pub struct ComponentStorage {
    pub name: String,
    pub root: PathBuf,
    storage: OnceCell<Storage>,
}

impl ComponentStorage {
    fn discover(components_root: &Path) -> BTreeMap<String, ComponentStorage> {
        let Ok(entries) = fs::read_dir(components_root) else {
            return BTreeMap::new();
        };

        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_dir() && has_dir_index(path))
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?.to_string();
                debug!(component = %name, "component index registered");
                Some((
                    name.clone(),
                    ComponentStorage {
                        name,
                        root: path,
                        storage: OnceCell::new(),
                    },
                ))
            })
            .collect()
    }

    pub fn storage(&self) -> &Storage {
        self.storage.get_or_init(|| Storage::build(&self.root, None))
    }

    pub fn is_built(&self) -> bool {
        self.storage.get().is_some()
    }
}

fn has_dir_index(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .any(|entry| entry.path().is_file() && paths::is_dir_index(&entry.path()))
        })
        .unwrap_or(false)
}
