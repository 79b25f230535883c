mod markdown_tests;

use std::path::PathBuf;

use super::TextFile;

/// A document parsed from `text` without touching the filesystem.
fn parsed(path: &str, text: &str) -> TextFile {
    let mut file = TextFile::new(PathBuf::from(path)).expect("document extension");
    file.load_text(text);
    file
}
