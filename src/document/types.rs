//! Value types extracted from documents.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::paths::{self, DOC_EXTENSIONS};

/// The syntax a link was written in. Decides which boundary scopes its rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LinkKind {
    /// `[text](target)` and `![alt](target)`
    Markdown,
    /// `xref:target[...]`
    Xref,
    /// `link:target[...]`
    LinkMacro,
    /// `image::target[...]`
    BlockImage,
    /// `image:target[...]`
    InlineImage,
}

impl LinkKind {
    pub fn is_image_macro(&self) -> bool {
        matches!(self, LinkKind::BlockImage | LinkKind::InlineImage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LinkType {
    Image,
    DirIndex,
    DirIndexUnderscored,
    Text,
}

/// A cross-reference from one document to another file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    pub source: PathBuf,
    pub target: String,
    pub kind: LinkKind,
    /// Set for image links that follow an `:imagesdir:` declaration.
    pub images_dir: Option<String>,
}

impl Link {
    /// Returns `None` for targets with an ignored prefix; those never become links.
    pub fn new(source: &Path, target: &str, kind: LinkKind) -> Option<Link> {
        if target.is_empty() || paths::is_ignored_target(target) {
            return None;
        }

        Some(Link {
            source: source.to_path_buf(),
            target: target.to_string(),
            kind,
            images_dir: None,
        })
    }

    pub fn with_images_dir(mut self, images_dir: Option<String>) -> Link {
        self.images_dir = images_dir;
        self
    }

    pub fn anchor(&self) -> Option<&str> {
        self.target.rsplit_once('#').map(|(_, anchor)| anchor)
    }

    pub fn target_without_anchor(&self) -> &str {
        self.target
            .rsplit_once('#')
            .map_or(self.target.as_str(), |(path, _)| path)
    }

    pub fn link_type(&self) -> LinkType {
        if self.kind.is_image_macro() || has_asset_extension(self.target_without_anchor()) {
            return LinkType::Image;
        }

        let stem = paths::bare_stem(&self.source);
        if paths::is_dir_index_stem(&stem) {
            LinkType::DirIndex
        } else if paths::is_dir_index_underscored_stem(&stem) {
            LinkType::DirIndexUnderscored
        } else {
            LinkType::Text
        }
    }

    pub fn is_rebased(&self) -> bool {
        self.images_dir.is_some() && self.link_type() == LinkType::Image
    }
}

fn has_asset_extension(target: &str) -> bool {
    if target.ends_with('/') {
        return false;
    }

    Path::new(target)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| !DOC_EXTENSIONS.contains(&ext) && ext != "en")
}

/// A [`Link`] bound to the zero-based line it was found on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkItem {
    pub line: usize,
    pub link: Link,
}

/// A reference to an anchor of the same document (`#anchor`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InternalLink {
    pub line: usize,
    pub anchor: String,
}

/// One applied line rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineChange {
    pub line: usize,
    pub before: String,
    pub after: String,
}
