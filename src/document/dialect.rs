//! The two document dialects and their link/anchor syntax.
//!
//! A [`Dialect`] is a closed set; each variant hands out a zero-sized
//! [`DocumentSyntax`] implementation holding its patterns and boundaries.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::LinkKind;

/// Which kind of token a bounded replacement targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    Link(LinkKind),
    Anchor,
    InternalLink,
}

/// `(prefix, suffix)` pairs wrapping a token on a line.
pub type Boundaries = &'static [(&'static str, &'static str)];

pub trait DocumentSyntax: Sync {
    /// Anchor names declared on one line.
    fn extract_anchors(&self, line: &str) -> Vec<String>;

    /// Raw link targets on one line, ignored prefixes included.
    fn extract_links(&self, line: &str) -> Vec<(String, LinkKind)>;

    /// Anchors referenced from the same document on one line.
    fn extract_internal_links(&self, line: &str) -> Vec<String>;

    /// The images base directory declared on this line, if any.
    fn rebase_imagesdir(&self, _line: &str) -> Option<String> {
        None
    }

    /// Whether the line opens or closes a literal block.
    fn is_fence(&self, line: &str) -> bool;

    fn boundaries(&self, kind: BoundaryKind) -> Boundaries;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dialect {
    /// Markdown-style documents (`.md`)
    Primary,
    /// AsciiDoc-style documents (`.adoc`)
    Alternate,
}

impl Dialect {
    pub fn from_path(path: &Path) -> Option<Dialect> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("md") => Some(Dialect::Primary),
            Some("adoc") => Some(Dialect::Alternate),
            _ => None,
        }
    }

    pub fn syntax(self) -> &'static dyn DocumentSyntax {
        match self {
            Dialect::Primary => &MarkdownSyntax,
            Dialect::Alternate => &AsciidocSyntax,
        }
    }
}

fn captures_named(re: &Regex, line: &str, name: &str) -> Vec<String> {
    re.captures_iter(line)
        .filter_map(|captures| captures.name(name))
        .map(|found| found.as_str().to_string())
        .collect()
}

pub struct MarkdownSyntax;

static MD_ANCHOR_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{#(?<anchor>[^}\s]+)[}\s]").unwrap()); // {#name} or {#name .class}

static MD_ANCHOR_HTML_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<a\s+(?:[^>]*?\s)?(?:name|id)="(?<anchor>[^"]+)""#).unwrap()
}); // <a name="name"> / <a id="name">

static MD_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\]\((?<target>[^)\s"]+(?:[ \t]+[^)\s"]+)*)(?:[ \t]+"[^"]*")?[ \t]*\)"#).unwrap()
}); // ](target) with an optional "title"; matches images and nested links alike

static MD_INTERNAL_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\]\(#(?<anchor>[^)\s"]+)(?:[ \t]+"[^"]*")?[ \t]*\)"#).unwrap());

impl DocumentSyntax for MarkdownSyntax {
    fn extract_anchors(&self, line: &str) -> Vec<String> {
        let mut anchors = captures_named(&MD_ANCHOR_ATTR_RE, line, "anchor");
        anchors.extend(captures_named(&MD_ANCHOR_HTML_RE, line, "anchor"));
        anchors
    }

    fn extract_links(&self, line: &str) -> Vec<(String, LinkKind)> {
        captures_named(&MD_LINK_RE, line, "target")
            .into_iter()
            .map(|target| (target, LinkKind::Markdown))
            .collect()
    }

    fn extract_internal_links(&self, line: &str) -> Vec<String> {
        captures_named(&MD_INTERNAL_LINK_RE, line, "anchor")
    }

    fn is_fence(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        trimmed.starts_with("```") || trimmed.starts_with("~~~")
    }

    fn boundaries(&self, kind: BoundaryKind) -> Boundaries {
        match kind {
            BoundaryKind::Link(_) => &[("(", ")"), ("(", " "), ("(", "\t")],
            BoundaryKind::Anchor => &[("{#", "}"), ("{#", " "), ("name=\"", "\""), ("id=\"", "\"")],
            BoundaryKind::InternalLink => &[("(#", ")"), ("(#", " ")],
        }
    }
}

pub struct AsciidocSyntax;

static ADOC_ANCHOR_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[#(?<anchor>[^\]\s.,%#]+)[\].,%]").unwrap()); // [#name] / [#name.role]

static ADOC_ANCHOR_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[(?<anchor>[^\[\]\s,]+)(?:,[^\]]*)?\]\]").unwrap()); // [[name]] / [[name,reftext]]

static ADOC_ANCHOR_INLINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\banchor:(?<anchor>[^\[\s]+)\[").unwrap());

// a macro target runs up to `[` and never spans whitespace, so prose like
// `the image:latest tag` is not a link
static ADOC_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?<macro>xref:|link:|image::|image:)(?<target>[^\[\s]+)\[").unwrap()
});

static ADOC_INTERNAL_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<<(?<anchor>[^,<>\s]+)(?:,[^>]*)?>>").unwrap());

static ADOC_IMAGESDIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:imagesdir:[ \t]*(?<dir>\S.*?)[ \t]*$").unwrap());

impl DocumentSyntax for AsciidocSyntax {
    fn extract_anchors(&self, line: &str) -> Vec<String> {
        let mut anchors = captures_named(&ADOC_ANCHOR_ID_RE, line, "anchor");
        anchors.extend(captures_named(&ADOC_ANCHOR_BLOCK_RE, line, "anchor"));
        anchors.extend(captures_named(&ADOC_ANCHOR_INLINE_RE, line, "anchor"));
        anchors
    }

    fn extract_links(&self, line: &str) -> Vec<(String, LinkKind)> {
        ADOC_LINK_RE
            .captures_iter(line)
            .filter_map(|captures| {
                let kind = match captures.name("macro")?.as_str() {
                    "xref:" => LinkKind::Xref,
                    "link:" => LinkKind::LinkMacro,
                    "image::" => LinkKind::BlockImage,
                    _ => LinkKind::InlineImage,
                };
                Some((captures.name("target")?.as_str().to_string(), kind))
            })
            .collect()
    }

    fn extract_internal_links(&self, line: &str) -> Vec<String> {
        captures_named(&ADOC_INTERNAL_LINK_RE, line, "anchor")
            .into_iter()
            // <<other.adoc#id>> points at another document
            .filter(|anchor| !anchor.contains('#') && !anchor.ends_with(".adoc"))
            .collect()
    }

    fn rebase_imagesdir(&self, line: &str) -> Option<String> {
        ADOC_IMAGESDIR_RE
            .captures(line.trim_end())
            .and_then(|captures| captures.name("dir"))
            .map(|dir| dir.as_str().to_string())
    }

    fn is_fence(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.starts_with("```")
            || (trimmed.len() >= 4
                && (trimmed.chars().all(|c| c == '-') || trimmed.chars().all(|c| c == '.')))
    }

    fn boundaries(&self, kind: BoundaryKind) -> Boundaries {
        match kind {
            BoundaryKind::Link(LinkKind::Xref) => &[("xref:", "[")],
            BoundaryKind::Link(LinkKind::LinkMacro) => &[("link:", "[")],
            BoundaryKind::Link(LinkKind::BlockImage) => &[("image::", "[")],
            BoundaryKind::Link(LinkKind::InlineImage) => &[("image:", "[")],
            BoundaryKind::Link(LinkKind::Markdown) => &[],
            BoundaryKind::Anchor => &[
                ("[#", "]"),
                ("[#", "."),
                ("[#", ","),
                ("[#", "%"),
                ("[[", "]]"),
                ("[[", ","),
                ("anchor:", "["),
            ],
            BoundaryKind::InternalLink => &[("<<", ">>"), ("<<", ",")],
        }
    }
}
