//! Name tables and three-tier name disambiguation.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use itertools::Itertools;
use tracing::error;

use crate::paths::tier_names;

/// The four tables of the document index, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableKind {
    /// `index.*` files, keyed by the directory they index
    DirIndex,
    /// `_index.*` files, keyed by the directory they index
    DirIndexUnderscored,
    /// Anything that is not a document, keyed by full file name
    Asset,
    /// Ordinary documents, keyed by stem
    Document,
}

impl TableKind {
    pub const PROBE_ORDER: [TableKind; 4] = [
        TableKind::DirIndex,
        TableKind::DirIndexUnderscored,
        TableKind::Asset,
        TableKind::Document,
    ];
}

/// Disambiguated name -> absolute path.
///
/// A name inserted twice is marked ambiguous and never answers a lookup.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NameTable {
    entries: HashMap<String, PathBuf>,
    ambiguous: HashSet<String>,
}

impl NameTable {
    pub fn get(&self, name: &str) -> Option<&Path> {
        if self.ambiguous.contains(name) {
            return None;
        }
        self.entries.get(name).map(PathBuf::as_path)
    }

    pub fn insert(&mut self, name: String, path: PathBuf) {
        if self.ambiguous.contains(&name) {
            error!(name = %name, path = %path.display(), "index name is ambiguous");
            return;
        }

        match self.entries.get(&name) {
            Some(existing) if *existing != path => {
                error!(
                    name = %name,
                    first = %existing.display(),
                    second = %path.display(),
                    "index name is ambiguous; links inferring it need an explicit path"
                );
                self.entries.remove(&name);
                self.ambiguous.insert(name);
            }
            Some(_) => {}
            None => {
                self.entries.insert(name, path);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.ambiguous.contains(name)
    }
}

/// A file to be named: its path and the path parts its names are built from.
#[derive(Debug, Clone)]
pub struct NameSource {
    pub path: PathBuf,
    pub parts: Vec<String>,
}

/// Picks, per file, the coarsest name that is unique within `sources`:
/// tier 1 (`stem`) if unique, else tier 2 (`parent/stem`), else tier 3.
pub fn disambiguate(sources: &[NameSource]) -> Vec<(String, PathBuf)> {
    let tiers = sources
        .iter()
        .map(|source| tier_names(&source.parts))
        .collect_vec();

    let counts: Vec<HashMap<&str, usize>> = (0..3)
        .map(|tier| {
            tiers
                .iter()
                .filter_map(|names| names.get(tier))
                .map(String::as_str)
                .counts()
        })
        .collect();

    sources
        .iter()
        .zip(&tiers)
        .filter_map(|(source, names)| {
            let unique = names
                .iter()
                .enumerate()
                .find(|(tier, name)| counts[*tier].get(name.as_str()) == Some(&1))
                .map(|(_, name)| name);

            unique
                .or_else(|| names.last())
                .map(|name| (name.clone(), source.path.clone()))
        })
        .collect()
}
