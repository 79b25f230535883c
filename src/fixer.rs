//! Syntactic repair of link text, ahead of resolution.

use tracing::warn;

use crate::audit::{Audit, IssueKind, Severity};
use crate::document::{BoundaryKind, LinkType, TextFile};
use crate::error::FixError;

/// `a b/c` -> `ab/c`
pub fn strip_whitespace(target: &str) -> String {
    target.chars().filter(|c| !c.is_whitespace()).collect()
}

/// `..foo/bar` -> `../foo/bar`, at the start of the target or of any segment.
pub fn slash_after_parent(target: &str) -> String {
    let mut out = String::with_capacity(target.len() + 1);
    let mut rest = target;
    let mut segment_start = true;

    while !rest.is_empty() {
        if segment_start && rest.starts_with("..") && !rest[2..].starts_with('/') {
            out.push_str("../");
            rest = &rest[2..];
            continue;
        }

        let mut chars = rest.chars();
        let Some(ch) = chars.next() else {
            break;
        };
        out.push(ch);
        segment_start = ch == '/';
        rest = chars.as_str();
    }

    out
}

/// `page#section` -> `page/#section`. A marker at the very start is an
/// internal link and stays as it is.
pub fn slash_before_anchor(target: &str) -> String {
    match target.rfind('#') {
        Some(0) | None => target.to_string(),
        Some(index) if target[..index].ends_with('/') => target.to_string(),
        Some(index) => format!("{}/{}", &target[..index], &target[index..]),
    }
}

/// The fixes, in the order they run. Each sees the result of the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fix {
    Whitespace,
    ParentSlash,
    AnchorSlash,
}

impl Fix {
    const ORDER: [Fix; 3] = [Fix::Whitespace, Fix::ParentSlash, Fix::AnchorSlash];

    fn apply(self, target: &str) -> String {
        match self {
            Fix::Whitespace => strip_whitespace(target),
            Fix::ParentSlash => slash_after_parent(target),
            Fix::AnchorSlash => slash_before_anchor(target),
        }
    }

    fn description(self) -> &'static str {
        match self {
            Fix::Whitespace => "whitespace in link",
            Fix::ParentSlash => "missing `/` after `..`",
            Fix::AnchorSlash => "missing `/` before `#`",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LinkFixer;

impl LinkFixer {
    pub fn new() -> Self {
        LinkFixer
    }

    /// Runs every fix over every link of `file`; returns how many links changed.
    ///
    /// Fails only when a link is not where its recorded line says it is.
    pub fn fix_file(&self, file: &mut TextFile, audit: &mut Audit) -> Result<usize, FixError> {
        let mut fixed = 0;

        for index in 0..file.links.len() {
            let original = file.links[index].link.target.clone();

            for fix in Fix::ORDER {
                let item = &file.links[index];
                // asset anchors are taken as written
                if fix == Fix::AnchorSlash && item.link.link_type() == LinkType::Image {
                    continue;
                }

                let current = item.link.target.clone();
                let repaired = fix.apply(&current);
                if repaired == current {
                    continue;
                }

                let line = item.line;
                let boundary = BoundaryKind::Link(item.link.kind);
                if file.locate(line, &current, boundary).is_none() {
                    return Err(FixError::AnchorMarker {
                        file: file.path.clone(),
                        line: line + 1,
                        target: current,
                    });
                }

                let changes = file.update_line(&[line], &current, &repaired, Some(boundary));
                warn!(
                    file = %file.path.display(),
                    line = line + 1,
                    target = %current,
                    fixed = %repaired,
                    "{}",
                    fix.description()
                );
                audit.push_changes(
                    Severity::Warning,
                    IssueKind::LinkDefect,
                    &file.path,
                    fix.description(),
                    &changes,
                );
                file.links[index].link.target = repaired;
            }

            if file.links[index].link.target != original {
                fixed += 1;
            }
        }

        Ok(fixed)
    }
}
