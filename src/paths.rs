//! Path candidates and file-name conventions.
//!
//! Everything here is pure: no function touches the filesystem except
//! [`first_existing`].

use std::ffi::OsString;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Extensions of the two document dialects, primary first.
pub const DOC_EXTENSIONS: [&str; 2] = ["md", "adoc"];

/// Link targets starting with any of these are never treated as repairable links.
pub const IGNORED_PREFIXES: [&str; 8] = ["http", "mailto", "/", "#", "ftp:", "tel:", "data:", "{{"];

const ENGLISH_INFIX: &str = ".en";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    Default,
    English,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Default => write!(f, "default"),
            Language::English => write!(f, "en"),
        }
    }
}

/// `page.en.md` and `page.en` are English, everything else is the default language.
pub fn language_of(path: &Path) -> Language {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return Language::Default;
    };

    if name.contains(".en.") || name.ends_with(ENGLISH_INFIX) {
        Language::English
    } else {
        Language::Default
    }
}

pub fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DOC_EXTENSIONS.contains(&ext))
}

/// File stem with the language infix removed: `index.en.md` -> `index`.
pub fn bare_stem(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();

    stem.strip_suffix(ENGLISH_INFIX).unwrap_or(stem).to_string()
}

pub fn is_dir_index_stem(stem: &str) -> bool {
    stem == "index"
}

pub fn is_dir_index_underscored_stem(stem: &str) -> bool {
    stem == "_index"
}

pub fn is_dir_index(path: &Path) -> bool {
    let stem = bare_stem(path);
    is_document(path) && (is_dir_index_stem(&stem) || is_dir_index_underscored_stem(&stem))
}

pub fn is_ignored_target(target: &str) -> bool {
    IGNORED_PREFIXES
        .iter()
        .any(|prefix| target.starts_with(prefix))
}

/// Lexically resolves `.` and `..` components. Nothing is looked up on disk,
/// so paths that do not exist normalise as well.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Every plausible on-disk file for a link path: the path itself, then for
/// each dialect the path with the extension appended, as a directory with an
/// `index`/`_index` file, and the `.en` variants of all of those.
pub fn expand_suffixes(path: &Path, prefer_english: bool) -> Vec<PathBuf> {
    let mut candidates = vec![path.to_path_buf()];

    for ext in DOC_EXTENSIONS {
        let default = [
            with_suffix(path, ext),
            path.join(format!("index.{ext}")),
            path.join(format!("_index.{ext}")),
        ];
        let english = [
            with_suffix(path, &format!("en.{ext}")),
            path.join(format!("index.en.{ext}")),
            path.join(format!("_index.en.{ext}")),
        ];

        if prefer_english {
            candidates.extend(english.into_iter().chain(default));
        } else {
            candidates.extend(default.into_iter().chain(english));
        }
    }

    candidates
}

/// The target as written, one level up and one level down.
pub fn trivial_options(target: &str) -> Vec<String> {
    let mut options = vec![target.to_string(), format!("../{target}")];
    if let Some(down) = target.strip_prefix("../") {
        options.push(down.to_string());
    }
    options.into_iter().unique().collect()
}

pub fn first_existing(candidates: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    candidates.into_iter().find(|candidate| candidate.is_file())
}

/// Names a link target can be looked up under in the document index:
/// `stem`, `parent/stem`, `grandparent/parent/stem`.
///
/// Document links drop their extension and a trailing directory-index file
/// name, so `../guide/index.md` and `../guide/` both infer `guide`. Image
/// links keep the full file name.
pub fn inferred_names(target: &str, keep_extension: bool) -> Vec<String> {
    let mut parts = target
        .split('/')
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .map(str::to_string)
        .collect_vec();

    if !keep_extension {
        if let Some(last) = parts.last_mut() {
            let path = Path::new(last.as_str());
            if is_document(path) {
                *last = bare_stem(path);
            } else if let Some(stripped) = last.strip_suffix(ENGLISH_INFIX) {
                *last = stripped.to_string();
            }
        }
        if parts
            .last()
            .is_some_and(|last| is_dir_index_stem(last) || is_dir_index_underscored_stem(last))
        {
            parts.pop();
        }
    }

    tier_names(&parts)
}

/// Tier 1..=3 names from a list of path parts, coarsest first.
pub fn tier_names(parts: &[String]) -> Vec<String> {
    (1..=3)
        .filter(|tier| *tier <= parts.len())
        .map(|tier| parts[parts.len() - tier..].join("/"))
        .collect()
}
