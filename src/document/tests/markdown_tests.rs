use itertools::Itertools;

use super::parsed;
use crate::document::{Dialect, InternalLink, LinkKind};
use crate::paths::Language;

#[test]
fn markdown_link_parsing() {
    let file = parsed(
        "/docs/guide/page.md",
        "Intro [link](../other/) and ![img](img/logo.png \"Logo\").\n",
    );

    assert_eq!(file.dialect, Dialect::Primary);
    assert_eq!(file.language, Language::Default);

    let targets = file.links.iter().map(|item| item.link.target.as_str()).collect_vec();
    assert_eq!(targets, vec!["../other/", "img/logo.png"]);
    assert!(file.links.iter().all(|item| item.line == 0));
    assert!(file.links.iter().all(|item| item.link.kind == LinkKind::Markdown));
}

#[test]
fn markdown_ignored_targets_are_dropped() {
    let text = "\
[web](https://example.com)
[mail](mailto:someone@example.com)
[abs](/root/page/)
[local](#section)
[kept](../kept/)
";
    let file = parsed("/docs/page.md", text);

    let targets = file.links.iter().map(|item| item.link.target.as_str()).collect_vec();
    assert_eq!(targets, vec!["../kept/"]);
    assert_eq!(file.links[0].line, 4);
}

#[test]
fn markdown_link_with_whitespace_in_target() {
    let file = parsed("/docs/page.md", "See [x](../my page/ \"title\").\n");

    assert_eq!(file.links.len(), 1);
    assert_eq!(file.links[0].link.target, "../my page/");
}

#[test]
fn markdown_nested_image_link() {
    let file = parsed("/docs/page.md", "[![badge](img/badge.svg)](../target/)\n");

    let targets = file.links.iter().map(|item| item.link.target.as_str()).collect_vec();
    assert_eq!(targets, vec!["img/badge.svg", "../target/"]);
}

#[test]
fn markdown_anchor_syntaxes() {
    let text = "\
## Install {#install}
## Usage {#usage .wide}
<a name=\"legacy\"></a>
<a class=\"x\" id=\"by-id\">here</a>
";
    let file = parsed("/docs/page.md", text);

    assert_eq!(
        file.anchors.iter().sorted().collect_vec(),
        vec!["by-id", "install", "legacy", "usage"]
    );
    assert_eq!(file.anchor_lines[0], (0, "install".to_string()));
}

#[test]
fn markdown_internal_links() {
    let text = "Jump [up](#top) or [down](#bottom \"Bottom\").\n\nAgain [up](#top)\n";
    let file = parsed("/docs/page.md", text);

    assert!(file.links.is_empty());
    assert_eq!(file.internal_links.len(), 3);
    assert!(file.internal_links.contains(&InternalLink {
        line: 0,
        anchor: "bottom".into()
    }));
    assert!(file.internal_links.contains(&InternalLink {
        line: 2,
        anchor: "top".into()
    }));
}

#[test]
fn markdown_code_blocks_are_not_scanned() {
    let text = "\
[real](../real/)
```md
[fake](../fake/) {#fake}
```
~~~
[also-fake](../nope/)
~~~
";
    let file = parsed("/docs/page.md", text);

    let targets = file.links.iter().map(|item| item.link.target.as_str()).collect_vec();
    assert_eq!(targets, vec!["../real/"]);
    assert!(file.anchors.is_empty());
}

#[test]
fn markdown_english_file() {
    let file = parsed("/docs/page.en.md", "[x](../y/)\n");
    assert_eq!(file.language, Language::English);
}

#[test]
fn duplicate_anchors_within_file() {
    let text = "# A {#same}\n# B {#same}\n# C {#other}\n";
    let file = parsed("/docs/page.md", text);

    assert_eq!(file.duplicate_anchors(), vec![("same".to_string(), vec![0, 1])]);
}

#[test]
fn dangling_internal_links() {
    let text = "# A {#here}\n[ok](#here) [bad](#missing)\n";
    let file = parsed("/docs/page.md", text);

    let dangling = file.dangling_internal_links();
    assert_eq!(dangling.len(), 1);
    assert_eq!(dangling[0].anchor, "missing");
}
