//! The in-memory model of one documentation file.
//!
//! A [`TextFile`] keeps every line of the file verbatim (line terminators
//! included), so a rewrite only ever touches the lines it was asked to touch.

mod dialect;
mod types;

#[cfg(test)]
mod tests;

pub use dialect::{AsciidocSyntax, BoundaryKind, Boundaries, Dialect, DocumentSyntax, MarkdownSyntax};
pub use types::{InternalLink, LineChange, Link, LinkItem, LinkKind, LinkType};

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use itertools::Itertools;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::DocumentError;
use crate::paths::{self, Language};

/// Repeated bounded replacements on a single line stop after this many hits.
const MAX_REPLACEMENTS_PER_LINE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFile {
    pub path: PathBuf,
    pub dialect: Dialect,
    pub language: Language,
    pub content: Vec<String>,
    pub anchors: HashSet<String>,
    /// Every anchor declaration in file order, duplicates kept.
    pub anchor_lines: Vec<(usize, String)>,
    pub links: Vec<LinkItem>,
    pub internal_links: HashSet<InternalLink>,
    /// First `:imagesdir:` declaration: (line, directory)
    pub images_dir: Option<(usize, String)>,
    pub changed: bool,
}

impl TextFile {
    /// Returns `None` when the path does not carry a document extension.
    pub fn new(path: PathBuf) -> Option<TextFile> {
        let dialect = Dialect::from_path(&path)?;
        let language = paths::language_of(&path);

        Some(TextFile {
            path,
            dialect,
            language,
            content: vec![],
            anchors: HashSet::new(),
            anchor_lines: vec![],
            links: vec![],
            internal_links: HashSet::new(),
            images_dir: None,
            changed: false,
        })
    }

    /// Loads the file and runs every extraction pass.
    pub fn read(&mut self) -> Result<(), DocumentError> {
        let text = fs::read_to_string(&self.path)
            .map_err(|err| DocumentError::from_io(self.path.clone(), err))?;

        self.load_text(&text);
        Ok(())
    }

    /// Replaces the buffer with `text` and re-extracts everything from it.
    pub fn load_text(&mut self, text: &str) {
        self.content = text.split_inclusive('\n').map(String::from).collect();
        self.changed = false;

        // imagesdir first: link extraction consults it for image links
        self.set_imagesdir();
        self.set_anchors();
        self.set_links();
        self.set_internal_links();
    }

    fn syntax(&self) -> &'static dyn DocumentSyntax {
        self.dialect.syntax()
    }

    /// Indices of the lines outside literal blocks; fence lines themselves excluded.
    fn scannable_lines(&self) -> Vec<usize> {
        let syntax = self.syntax();
        let mut in_block = false;

        self.content
            .iter()
            .enumerate()
            .filter_map(|(index, line)| {
                if syntax.is_fence(line) {
                    in_block = !in_block;
                    return None;
                }
                (!in_block).then_some(index)
            })
            .collect()
    }

    pub fn set_imagesdir(&mut self) {
        let syntax = self.syntax();
        self.images_dir = self
            .scannable_lines()
            .into_iter()
            .find_map(|index| {
                syntax
                    .rebase_imagesdir(&self.content[index])
                    .map(|dir| (index, dir))
            });
    }

    pub fn set_anchors(&mut self) {
        let syntax = self.syntax();
        self.anchor_lines = self
            .scannable_lines()
            .into_iter()
            .flat_map(|index| {
                syntax
                    .extract_anchors(&self.content[index])
                    .into_iter()
                    .map(move |anchor| (index, anchor))
            })
            .collect();
        self.anchors = self
            .anchor_lines
            .iter()
            .map(|(_, anchor)| anchor.clone())
            .collect();
    }

    pub fn set_links(&mut self) {
        let syntax = self.syntax();
        let images_dir = self.images_dir.clone();

        self.links = self
            .scannable_lines()
            .into_iter()
            .flat_map(|index| {
                syntax
                    .extract_links(&self.content[index])
                    .into_iter()
                    .map(move |(target, kind)| (index, target, kind))
            })
            .filter_map(|(index, target, kind)| {
                let link = Link::new(&self.path, &target, kind)?;
                let rebase = images_dir
                    .as_ref()
                    .filter(|(declared, _)| *declared < index)
                    .filter(|_| link.link_type() == LinkType::Image)
                    .map(|(_, dir)| dir.clone());

                Some(LinkItem {
                    line: index,
                    link: link.with_images_dir(rebase),
                })
            })
            .collect();
    }

    pub fn set_internal_links(&mut self) {
        let syntax = self.syntax();
        self.internal_links = self
            .scannable_lines()
            .into_iter()
            .flat_map(|index| {
                syntax
                    .extract_internal_links(&self.content[index])
                    .into_iter()
                    .map(move |anchor| InternalLink {
                        line: index,
                        anchor,
                    })
            })
            .collect();
    }

    fn bounded_replacement(&self, line: &str, old: &str, new: &str, boundary: Option<BoundaryKind>) -> Option<String> {
        match boundary {
            None => line.contains(old).then(|| line.replacen(old, new, 1)),
            Some(kind) => self
                .syntax()
                .boundaries(kind)
                .iter()
                .find_map(|(prefix, suffix)| {
                    let bounded = format!("{prefix}{old}{suffix}");
                    line.contains(&bounded)
                        .then(|| line.replacen(&bounded, &format!("{prefix}{new}{suffix}"), 1))
                }),
        }
    }

    /// Replaces the first occurrence of `old` with `new` on each given line.
    ///
    /// With a boundary only the bounded form (`prefix + old + suffix`) is
    /// replaced, so the token itself is hit rather than an incidental match
    /// elsewhere on the line.
    pub fn update_line(
        &mut self,
        lines: &[usize],
        old: &str,
        new: &str,
        boundary: Option<BoundaryKind>,
    ) -> Vec<LineChange> {
        let mut changes = vec![];

        for &index in lines {
            let Some(before) = self.content.get(index).cloned() else {
                warn!(file = %self.path.display(), line = index, "line index out of range");
                continue;
            };

            match self.bounded_replacement(&before, old, new, boundary) {
                Some(after) if after != before => {
                    debug!(
                        file = %self.path.display(),
                        line = index + 1,
                        before = before.trim_end(),
                        after = after.trim_end(),
                        "line updated"
                    );
                    self.content[index] = after.clone();
                    self.changed = true;
                    changes.push(LineChange {
                        line: index,
                        before,
                        after,
                    });
                }
                _ => debug!(
                    file = %self.path.display(),
                    line = index + 1,
                    old,
                    "nothing to replace"
                ),
            }
        }

        changes
    }

    /// Byte position of a bounded token on a line.
    pub fn locate(&self, line: usize, token: &str, boundary: BoundaryKind) -> Option<usize> {
        let text = self.content.get(line)?;
        self.syntax()
            .boundaries(boundary)
            .iter()
            .find_map(|(prefix, suffix)| {
                text.find(&format!("{prefix}{token}{suffix}"))
                    .map(|start| start + prefix.len())
            })
    }

    /// Renames an anchor declaration and every internal link pointing at it.
    pub fn rename_anchor(&mut self, old: &str, new: &str) -> Vec<LineChange> {
        let declaration_lines = self
            .anchor_lines
            .iter()
            .filter(|(_, anchor)| anchor == old)
            .map(|(line, _)| *line)
            .unique()
            .collect_vec();
        let reference_lines = self
            .internal_links
            .iter()
            .filter(|link| link.anchor == old)
            .map(|link| link.line)
            .sorted()
            .unique()
            .collect_vec();

        let mut changes = self.replace_on_lines(&declaration_lines, old, new, BoundaryKind::Anchor);
        changes.extend(self.replace_on_lines(&reference_lines, old, new, BoundaryKind::InternalLink));

        for (_, anchor) in self.anchor_lines.iter_mut().filter(|(_, anchor)| anchor == old) {
            *anchor = new.to_string();
        }
        if self.anchors.remove(old) {
            self.anchors.insert(new.to_string());
        }
        self.internal_links = self
            .internal_links
            .drain()
            .map(|link| match link.anchor == old {
                true => InternalLink {
                    line: link.line,
                    anchor: new.to_string(),
                },
                false => link,
            })
            .collect();

        changes
    }

    /// Bounded replacement of every occurrence on each line.
    fn replace_on_lines(
        &mut self,
        lines: &[usize],
        old: &str,
        new: &str,
        boundary: BoundaryKind,
    ) -> Vec<LineChange> {
        let mut changes = vec![];
        for &line in lines {
            for _ in 0..MAX_REPLACEMENTS_PER_LINE {
                match self.update_line(&[line], old, new, Some(boundary)).pop() {
                    Some(change) => changes.push(change),
                    None => break,
                }
            }
        }
        changes
    }

    /// Anchors declared more than once in this file, with the lines declaring them.
    pub fn duplicate_anchors(&self) -> Vec<(String, Vec<usize>)> {
        self.anchor_lines
            .iter()
            .into_group_map_by(|(_, anchor)| anchor.clone())
            .into_iter()
            .filter(|(_, occurrences)| occurrences.len() > 1)
            .map(|(anchor, occurrences)| {
                (anchor, occurrences.into_iter().map(|(line, _)| *line).collect())
            })
            .sorted()
            .collect()
    }

    /// Internal links whose anchor is not declared in this file.
    pub fn dangling_internal_links(&self) -> Vec<&InternalLink> {
        self.internal_links
            .iter()
            .filter(|link| !self.anchors.contains(&link.anchor))
            .sorted()
            .collect()
    }

    pub fn is_dir_index(&self) -> bool {
        paths::is_dir_index(&self.path)
    }

    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }

    pub fn text(&self) -> String {
        self.content.concat()
    }

    /// Persists the buffer if anything changed. The new content is written to
    /// a temporary file beside the original and renamed over it; the
    /// original's permissions carry over.
    pub fn write(&mut self) -> io::Result<bool> {
        if !self.changed {
            return Ok(false);
        }

        let permissions = match fs::metadata(&self.path) {
            Ok(metadata) => Some(metadata.permissions()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => return Err(err),
        };

        let mut temp = NamedTempFile::new_in(self.directory())?;
        temp.write_all(self.text().as_bytes())?;
        temp.flush()?;
        if let Some(permissions) = permissions {
            temp.as_file().set_permissions(permissions)?;
        }
        temp.persist(&self.path).map_err(|err| err.error)?;

        self.changed = false;
        Ok(true)
    }
}
