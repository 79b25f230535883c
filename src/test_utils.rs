//! Shared test utilities.
//!
//! Only compiled when running tests.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Creates a temporary documentation root for testing.
///
/// Returns a tuple of (TempDir, PathBuf) where:
/// - TempDir: The temp directory handle (must be kept alive for the test duration)
/// - PathBuf: The path to the docs subdirectory
///
/// The index walk skips hidden entries, and temp directories are sometimes
/// created as `/tmp/.tmpXXXXX`, so the files live in a non-hidden `docs`
/// subdirectory.
pub fn create_test_docs_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let docs_dir = temp_dir.path().join("docs");
    fs::create_dir(&docs_dir).expect("Failed to create docs subdirectory");
    (temp_dir, docs_dir)
}

/// Creates a documentation root and lets `setup_fn` populate it.
///
/// ```ignore
/// let (_temp_dir, docs_dir) = create_test_docs(|dir| {
///     write_file(dir, "guide/index.md", "# Guide");
/// });
/// ```
pub fn create_test_docs<F>(setup_fn: F) -> (TempDir, PathBuf)
where
    F: FnOnce(&Path),
{
    let (temp_dir, docs_dir) = create_test_docs_dir();
    setup_fn(&docs_dir);
    (temp_dir, docs_dir)
}

/// Writes `content` to `dir/rel_path`, creating parent directories.
pub fn write_file(dir: &Path, rel_path: &str, content: &str) -> PathBuf {
    let path = dir.join(rel_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directories");
    }
    fs::write(&path, content).unwrap_or_else(|_| panic!("Failed to write {rel_path}"));
    path
}
