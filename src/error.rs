//! Error types shared by the document model and the repair stages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a document could not be loaded.
///
/// None of these stop a run: the file is logged, audited and skipped.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("`{0}` is not valid UTF-8 text")]
    Decode(PathBuf),

    #[error("permission denied reading `{0}`")]
    Permission(PathBuf),

    #[error("`{0}` does not exist")]
    Missing(PathBuf),

    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] io::Error),
}

impl DocumentError {
    pub fn from_io(path: PathBuf, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::InvalidData => DocumentError::Decode(path),
            io::ErrorKind::PermissionDenied => DocumentError::Permission(path),
            io::ErrorKind::NotFound => DocumentError::Missing(path),
            _ => DocumentError::Io(path, err),
        }
    }
}

/// Invariant violations. These abort the whole run.
#[derive(Debug, Error)]
pub enum FixError {
    #[error(
        "impossible anchor marker position in `{file}` line {line}: link `{target}` is not on that line"
    )]
    AnchorMarker {
        file: PathBuf,
        line: usize,
        target: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_kinds_map_to_variants() {
        let path = PathBuf::from("doc.md");

        let err = DocumentError::from_io(path.clone(), io::Error::from(io::ErrorKind::InvalidData));
        assert!(matches!(err, DocumentError::Decode(_)));

        let err = DocumentError::from_io(
            path.clone(),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, DocumentError::Permission(_)));

        let err = DocumentError::from_io(path.clone(), io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, DocumentError::Missing(_)));

        let err = DocumentError::from_io(path, io::Error::from(io::ErrorKind::Other));
        assert!(matches!(err, DocumentError::Io(..)));
    }
}
