//! Finds the file each link means and rewrites the link to its canonical
//! relative form.
//!
//! Links are read the way the site renders them: an ordinary page
//! `dir/page.md` is served at `dir/page/`, a directory index at its
//! directory. A link is tried against that rendered location first, then one
//! level up or down from the file's own directory, and finally looked up by
//! name in the document index.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use tracing::{debug, error, warn};

use crate::anchors::renamed_forms;
use crate::audit::{Audit, AuditRecord, IssueKind, Severity};
use crate::document::{BoundaryKind, Link, LinkItem, LinkType, TextFile};
use crate::file_dict::FileDict;
use crate::paths::{self, Language};
use crate::storage::Storage;

/// Substituted for anchors no destination anchor could be matched to.
pub const ANCHOR_NOT_FOUND: &str = "anchor-not-found";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The literal target exists relative to where the source renders
    OriginalValid(PathBuf),
    /// Found one level up or down from the source directory
    FallbackValid(PathBuf),
    /// Found by name in the document index
    IndexFound(PathBuf),
    NotFound,
}

impl Resolution {
    pub fn destination(&self) -> Option<&Path> {
        match self {
            Resolution::OriginalValid(path)
            | Resolution::FallbackValid(path)
            | Resolution::IndexFound(path) => Some(path),
            Resolution::NotFound => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorState {
    /// The link has no anchor
    Root,
    Valid,
    /// Replaced by this destination anchor
    Repaired(String),
    NotFound,
    /// The destination is an asset, or a document that failed to load
    Unchecked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    pub line: usize,
    pub target: String,
    pub resolution: Resolution,
    pub anchor: AnchorState,
    pub canonical: Option<String>,
    pub rewritten: bool,
}

fn decode(target: &str) -> Cow<'_, str> {
    urlencoding::decode(target).unwrap_or(Cow::Borrowed(target))
}

/// `dir/page.md` renders at `dir/page`, `dir/index.md` at `dir`, assets as themselves.
fn rendered_location(path: &Path) -> PathBuf {
    let directory = path.parent().unwrap_or(Path::new(""));
    if !paths::is_document(path) {
        path.to_path_buf()
    } else if paths::is_dir_index(path) {
        directory.to_path_buf()
    } else {
        directory.join(paths::bare_stem(path))
    }
}

fn relative_path(path: &Path, base: &Path) -> Option<String> {
    let relative = pathdiff::diff_paths(path, base)?;
    Some(
        relative
            .components()
            .filter_map(|component| component.as_os_str().to_str())
            .join("/"),
    )
}

pub struct LinkInspector<'a> {
    storage: &'a Storage,
    files: &'a FileDict,
}

impl<'a> LinkInspector<'a> {
    pub fn new(storage: &'a Storage, files: &'a FileDict) -> Self {
        LinkInspector { storage, files }
    }

    /// Resolves every link of `file` and rewrites the ones that are not in
    /// canonical form. `file` must not be part of the collection while this
    /// runs; links back to it are checked against `file` itself.
    pub fn inspect_file(&self, file: &mut TextFile, audit: &mut Audit) -> Vec<LinkOutcome> {
        let mut outcomes = Vec::with_capacity(file.links.len());

        for index in 0..file.links.len() {
            let item = file.links[index].clone();
            let mut outcome = self.evaluate(file, &item);

            if let Some(canonical) = outcome.canonical.clone() {
                if canonical != item.link.target {
                    outcome.rewritten = self.rewrite(file, index, &outcome, &canonical, audit);
                }
            }
            self.report(file, &outcome, audit);
            outcomes.push(outcome);
        }

        outcomes
    }

    /// Resolution, anchor check and canonical form of one link; no side effects.
    pub fn evaluate(&self, file: &TextFile, item: &LinkItem) -> LinkOutcome {
        let link = &item.link;
        let resolution = self.resolve(file, link);

        let (anchor, canonical) = match resolution.destination() {
            Some(destination) => {
                let anchor = self.check_anchor(file, destination, link.anchor());
                let written = match &anchor {
                    AnchorState::Root => None,
                    AnchorState::Valid | AnchorState::Unchecked => link.anchor(),
                    AnchorState::Repaired(repaired) => Some(repaired.as_str()),
                    AnchorState::NotFound => Some(ANCHOR_NOT_FOUND),
                };
                let canonical = canonical_target(file, link, destination, written);
                (anchor, canonical)
            }
            None => (AnchorState::Unchecked, None),
        };

        LinkOutcome {
            line: item.line,
            target: link.target.clone(),
            resolution,
            anchor,
            canonical,
            rewritten: false,
        }
    }

    pub fn resolve(&self, file: &TextFile, link: &Link) -> Resolution {
        let target = decode(link.target_without_anchor());
        let is_image = link.link_type() == LinkType::Image;
        let prefer_english = file.language == Language::English;

        let candidates = |path: PathBuf| match is_image {
            true => vec![paths::normalize(&path)],
            false => paths::expand_suffixes(&paths::normalize(&path), prefer_english),
        };

        let base = origin_base(file, link);
        if let Some(found) = paths::first_existing(candidates(base.join(&*target))) {
            return Resolution::OriginalValid(found);
        }

        let directory = file.directory();
        for option in paths::trivial_options(&target) {
            if let Some(found) = paths::first_existing(candidates(directory.join(option))) {
                return Resolution::FallbackValid(found);
            }
        }

        let names = paths::inferred_names(&target, is_image);
        self.storage
            .component_for(&file.path)
            .and_then(|component| component.find(&names, file.language))
            .or_else(|| self.storage.find(&names, file.language))
            .map_or(Resolution::NotFound, Resolution::IndexFound)
    }

    pub fn check_anchor(&self, file: &TextFile, destination: &Path, anchor: Option<&str>) -> AnchorState {
        let Some(anchor) = anchor.filter(|anchor| !anchor.is_empty()) else {
            return AnchorState::Root;
        };
        if !paths::is_document(destination) {
            return AnchorState::Unchecked;
        }

        let destination = match destination == file.path {
            true => Some(file),
            false => self.files.text_file(destination),
        };
        let Some(destination) = destination else {
            return AnchorState::Unchecked;
        };

        if destination.anchors.contains(anchor) {
            return AnchorState::Valid;
        }

        if let Some(renamed) = renamed_forms(anchor, &destination.path)
            .into_iter()
            .find(|renamed| destination.anchors.contains(renamed))
        {
            return AnchorState::Repaired(renamed);
        }

        let prefix = format!("{anchor}-");
        destination
            .internal_links
            .iter()
            .sorted()
            .find(|link| {
                (link.anchor == anchor || link.anchor.starts_with(&prefix))
                    && destination.anchors.contains(&link.anchor)
            })
            .map_or(AnchorState::NotFound, |link| {
                AnchorState::Repaired(link.anchor.clone())
            })
    }

    fn report(&self, file: &TextFile, outcome: &LinkOutcome, audit: &mut Audit) {
        let line = outcome.line;

        if outcome.resolution == Resolution::NotFound {
            error!(
                file = %file.path.display(),
                line = line + 1,
                target = %outcome.target,
                "link target not found"
            );
            audit.push(
                AuditRecord::new(
                    Severity::Error,
                    IssueKind::LinkNotFound,
                    &file.path,
                    format!("no file matches `{}`", outcome.target),
                )
                .at_line(line),
            );
            return;
        }

        // a rewritten link was already reported by the rewrite
        if outcome.anchor == AnchorState::NotFound && !outcome.rewritten {
            error!(
                file = %file.path.display(),
                line = line + 1,
                target = %outcome.target,
                "anchor not found in destination, needs a manual fix"
            );
            audit.push(
                AuditRecord::new(
                    Severity::Error,
                    IssueKind::AnchorNotFound,
                    &file.path,
                    format!("no matching anchor for `{}`", outcome.target),
                )
                .at_line(line),
            );
        }
    }

    fn rewrite(
        &self,
        file: &mut TextFile,
        index: usize,
        outcome: &LinkOutcome,
        canonical: &str,
        audit: &mut Audit,
    ) -> bool {
        let line = outcome.line;
        let kind = file.links[index].link.kind;
        let changes = file.update_line(&[line], &outcome.target, canonical, Some(BoundaryKind::Link(kind)));

        if changes.is_empty() {
            warn!(
                file = %file.path.display(),
                line = line + 1,
                target = %outcome.target,
                canonical,
                "link could not be located for rewriting"
            );
            return false;
        }
        file.links[index].link.target = canonical.to_string();

        let (severity, issue, message) = match (&outcome.anchor, &outcome.resolution) {
            (AnchorState::NotFound, _) => (
                Severity::Error,
                IssueKind::AnchorNotFound,
                "anchor not found in destination, needs a manual fix",
            ),
            (AnchorState::Repaired(_), _) => (
                Severity::Warning,
                IssueKind::AnchorRepaired,
                "anchor repaired",
            ),
            (_, Resolution::OriginalValid(_)) => (
                Severity::Info,
                IssueKind::LinkRewritten,
                "link rewritten to canonical form",
            ),
            (_, Resolution::FallbackValid(_)) => (
                Severity::Warning,
                IssueKind::LinkRewritten,
                "broken link repaired from a nearby path",
            ),
            _ => (
                Severity::Warning,
                IssueKind::LinkRewritten,
                "broken link repaired from the document index",
            ),
        };

        match severity {
            Severity::Error => error!(
                file = %file.path.display(),
                line = line + 1,
                target = %outcome.target,
                canonical,
                "{message}"
            ),
            Severity::Warning => warn!(
                file = %file.path.display(),
                line = line + 1,
                target = %outcome.target,
                canonical,
                "{message}"
            ),
            Severity::Info => debug!(
                file = %file.path.display(),
                line = line + 1,
                target = %outcome.target,
                canonical,
                "{message}"
            ),
        }
        audit.push_changes(severity, issue, &file.path, message, &changes);
        true
    }
}

/// Where a relative link of `file` is read from on the first attempt.
fn origin_base(file: &TextFile, link: &Link) -> PathBuf {
    match link.images_dir.as_deref().filter(|_| link.is_rebased()) {
        Some(images_dir) => file.directory().join(images_dir),
        None => rendered_location(&file.path),
    }
}

/// The canonical link text from `file` to `destination`.
fn canonical_target(file: &TextFile, link: &Link, destination: &Path, anchor: Option<&str>) -> Option<String> {
    let mut canonical = match link.images_dir.as_deref().filter(|_| link.is_rebased()) {
        Some(images_dir) => {
            let base = paths::normalize(&file.directory().join(images_dir));
            relative_path(destination, &base)?
        }
        None => {
            let mut relative = relative_path(&rendered_location(destination), &file.path)?;
            if paths::is_document(destination) {
                relative.push('/');
            }
            if file.is_dir_index() {
                if let Some(stripped) = relative.strip_prefix("../") {
                    relative = stripped.to_string();
                }
            }
            match relative.starts_with("../") {
                true => relative,
                false => format!("./{relative}"),
            }
        }
    };

    canonical = canonical.replace(' ', "%20");
    if let Some(anchor) = anchor {
        canonical.push('#');
        canonical.push_str(anchor);
    }
    Some(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_docs, write_file};

    struct Fixture {
        _temp_dir: tempfile::TempDir,
        docs_dir: PathBuf,
        storage: Storage,
        files: FileDict,
        audit: Audit,
    }

    fn fixture(setup: impl FnOnce(&Path)) -> Fixture {
        let (temp_dir, docs_dir) = create_test_docs(setup);
        let mut audit = Audit::new(&docs_dir, true);
        let storage = Storage::build(&docs_dir, Some("components"));
        let files = FileDict::load(&docs_dir, &mut audit);
        Fixture {
            _temp_dir: temp_dir,
            docs_dir,
            storage,
            files,
            audit,
        }
    }

    impl Fixture {
        fn inspect(&mut self, rel: &str) -> (TextFile, Vec<LinkOutcome>) {
            let path = self.docs_dir.join(rel);
            let mut file = self.files.take(&path).unwrap();
            let outcomes = LinkInspector::new(&self.storage, &self.files).inspect_file(&mut file, &mut self.audit);
            (file, outcomes)
        }
    }

    #[test]
    fn canonical_link_from_index_is_kept() {
        let mut fx = fixture(|dir| {
            write_file(dir, "a/index.md", "[B](./b/#intro)\n");
            write_file(dir, "a/b/index.md", "## Intro {#intro}\n");
        });

        let (file, outcomes) = fx.inspect("a/index.md");

        assert_eq!(
            outcomes[0].resolution,
            Resolution::OriginalValid(fx.docs_dir.join("a/b/index.md"))
        );
        assert_eq!(outcomes[0].anchor, AnchorState::Valid);
        assert_eq!(outcomes[0].canonical.as_deref(), Some("./b/#intro"));
        assert!(!outcomes[0].rewritten);
        assert!(!file.changed);
    }

    #[test]
    fn index_link_is_canonicalised() {
        let mut fx = fixture(|dir| {
            write_file(dir, "a/index.md", "[B](b/#intro)\n");
            write_file(dir, "a/b/index.md", "## Intro {#intro}\n");
        });

        let (file, outcomes) = fx.inspect("a/index.md");

        assert!(outcomes[0].rewritten);
        assert_eq!(file.content[0], "[B](./b/#intro)\n");
        assert_eq!(fx.audit.count(IssueKind::LinkRewritten), 1);
    }

    #[test]
    fn sibling_page_found_one_level_up() {
        let mut fx = fixture(|dir| {
            write_file(dir, "guide/page.md", "[i](install.md)\n");
            write_file(dir, "guide/install.md", "# Install\n");
        });

        let (file, outcomes) = fx.inspect("guide/page.md");

        assert_eq!(
            outcomes[0].resolution,
            Resolution::FallbackValid(fx.docs_dir.join("guide/install.md"))
        );
        assert_eq!(file.content[0], "[i](../install/)\n");
    }

    #[test]
    fn index_lookup_by_parent_and_stem() {
        let mut fx = fixture(|dir| {
            write_file(dir, "x/page.md", "[s](somewhere/beta/setup.md)\n");
            write_file(dir, "alpha/setup.md", "alpha\n");
            write_file(dir, "beta/setup.md", "beta\n");
        });

        let (file, outcomes) = fx.inspect("x/page.md");

        assert_eq!(
            outcomes[0].resolution,
            Resolution::IndexFound(fx.docs_dir.join("beta/setup.md"))
        );
        assert_eq!(file.content[0], "[s](../../beta/setup/)\n");
    }

    #[test]
    fn component_index_wins_over_root_index() {
        let mut fx = fixture(|dir| {
            write_file(dir, "components/widget/_index.md", "[u](gone/usage)\n");
            write_file(dir, "components/widget/usage.md", "widget usage\n");
            write_file(dir, "other/deep/usage.md", "root usage\n");
        });

        let (_, outcomes) = fx.inspect("components/widget/_index.md");

        assert_eq!(
            outcomes[0].resolution,
            Resolution::IndexFound(fx.docs_dir.join("components/widget/usage.md"))
        );
        assert_eq!(outcomes[0].canonical.as_deref(), Some("./usage/"));
    }

    #[test]
    fn unresolvable_link_is_left_alone() {
        let mut fx = fixture(|dir| {
            write_file(dir, "page.md", "[n](../nowhere/)\n");
        });

        let (file, outcomes) = fx.inspect("page.md");

        assert_eq!(outcomes[0].resolution, Resolution::NotFound);
        assert!(!file.changed);
        assert_eq!(fx.audit.count(IssueKind::LinkNotFound), 1);
    }

    #[test]
    fn renamed_anchor_is_repaired() {
        let mut fx = fixture(|dir| {
            write_file(dir, "a/page.md", "[o](../other/#overview)\n");
            write_file(dir, "a/other.md", "## Overview {#overview-other}\n");
        });

        let (file, outcomes) = fx.inspect("a/page.md");

        assert_eq!(
            outcomes[0].anchor,
            AnchorState::Repaired("overview-other".to_string())
        );
        assert_eq!(file.content[0], "[o](../other/#overview-other)\n");
        assert_eq!(fx.audit.count(IssueKind::AnchorRepaired), 1);
    }

    #[test]
    fn anchor_repaired_from_destination_internal_links() {
        let mut fx = fixture(|dir| {
            write_file(dir, "a/page.md", "[o](../other/#setup)\n");
            write_file(dir, "a/other.md", "{#setup-linux}\nsee [here](#setup-linux)\n");
        });

        let (_, outcomes) = fx.inspect("a/page.md");

        assert_eq!(outcomes[0].anchor, AnchorState::Repaired("setup-linux".to_string()));
    }

    #[test]
    fn unknown_anchor_gets_the_sentinel() {
        let mut fx = fixture(|dir| {
            write_file(dir, "a/page.md", "[o](../other/#missing)\n");
            write_file(dir, "a/other.md", "{#present}\n");
        });

        let (file, outcomes) = fx.inspect("a/page.md");

        assert_eq!(outcomes[0].anchor, AnchorState::NotFound);
        assert_eq!(file.content[0], "[o](../other/#anchor-not-found)\n");
        assert_eq!(fx.audit.count(IssueKind::AnchorNotFound), 1);
    }

    #[test]
    fn self_links_use_the_taken_file() {
        let mut fx = fixture(|dir| {
            write_file(dir, "a/page.md", "{#top}\n[t](../page/#top)\n");
        });

        let (file, outcomes) = fx.inspect("a/page.md");

        assert_eq!(outcomes[0].anchor, AnchorState::Valid);
        assert!(!file.changed);
    }

    #[test]
    fn image_links_resolve_as_assets() {
        let mut fx = fixture(|dir| {
            write_file(dir, "a/index.md", "![l](img/logo.png) ![m](missing.png)\n");
            write_file(dir, "a/img/logo.png", "png");
        });

        let (file, outcomes) = fx.inspect("a/index.md");

        assert_eq!(outcomes[0].canonical.as_deref(), Some("./img/logo.png"));
        assert_eq!(outcomes[1].resolution, Resolution::NotFound);
        assert_eq!(file.content[0], "![l](./img/logo.png) ![m](missing.png)\n");
    }

    #[test]
    fn imagesdir_links_stay_relative_to_imagesdir() {
        let mut fx = fixture(|dir| {
            write_file(dir, "guide/page.adoc", ":imagesdir: ../assets\nimage::logo.png[Logo]\n");
            write_file(dir, "assets/logo.png", "png");
        });

        let (file, outcomes) = fx.inspect("guide/page.adoc");

        assert_eq!(
            outcomes[0].resolution,
            Resolution::OriginalValid(fx.docs_dir.join("assets/logo.png"))
        );
        assert_eq!(outcomes[0].canonical.as_deref(), Some("logo.png"));
        assert!(!file.changed);
    }

    #[test]
    fn percent_encoded_targets_are_decoded() {
        let mut fx = fixture(|dir| {
            write_file(dir, "a/page.md", "[s](../my%20notes/)\n");
            write_file(dir, "a/my notes.md", "notes\n");
        });

        let (file, outcomes) = fx.inspect("a/page.md");

        assert_eq!(
            outcomes[0].resolution,
            Resolution::OriginalValid(fx.docs_dir.join("a/my notes.md"))
        );
        assert!(!file.changed);
    }

    #[test]
    fn english_sources_prefer_english_destinations() {
        let mut fx = fixture(|dir| {
            write_file(dir, "a/page.en.md", "[g](../guide/)\n");
            write_file(dir, "a/guide.md", "default\n");
            write_file(dir, "a/guide.en.md", "english\n");
        });

        let (_, outcomes) = fx.inspect("a/page.en.md");

        assert_eq!(
            outcomes[0].resolution,
            Resolution::OriginalValid(fx.docs_dir.join("a/guide.en.md"))
        );
        assert_eq!(outcomes[0].canonical.as_deref(), Some("../guide/"));
    }
}
