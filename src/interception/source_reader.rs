// src/interception/source_reader.rs
//! Filesystem collaborator used to read real module sources

use std::io;
use url::Url;

/// Reads the text of a module given its absolute identifier
pub trait SourceReader: Send + Sync {
    fn read_text(&self, identifier: &str) -> io::Result<String>;
}

/// Reads `file:` URLs from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSourceReader;

impl SourceReader for FsSourceReader {
    fn read_text(&self, identifier: &str) -> io::Result<String> {
        let url = Url::parse(identifier)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        if url.scheme() != "file" {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a file: URL: {}", identifier),
            ));
        }

        let path = url.to_file_path().map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("file: URL has no local path: {}", identifier),
            )
        })?;

        std::fs::read_to_string(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_file_url() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "export default 1;").unwrap();

        let url = Url::from_file_path(file.path()).unwrap();
        let text = FsSourceReader.read_text(url.as_str()).unwrap();
        assert_eq!(text, "export default 1;");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::from_file_path(dir.path().join("missing.js")).unwrap();
        let err = FsSourceReader.read_text(url.as_str()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_rejects_other_schemes() {
        let err = FsSourceReader.read_text("node:fs").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
