//! Filesystem collaborators
//!
//! Document enumeration, dictionary reading and document opening. The
//! distribution engine only sees paths and byte streams; everything that
//! touches the filesystem layout lives here.

use crate::error::Error;
use crate::Result;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// A document to profile
///
/// The ordinal is the document's position in enumeration order and its
/// identity in the result matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub ordinal: usize,
}

impl Document {
    /// Display name (the path as given)
    pub fn name(&self) -> String {
        self.path.display().to_string()
    }
}

/// Enumerate every regular file under `dir`
///
/// Subdirectories are walked depth-first. Entries within a directory are
/// visited in file-name order so that ordinals are stable across runs.
/// Symbolic links are not followed.
pub fn enumerate_documents(dir: &Path) -> Result<Vec<Document>> {
    let meta = fs::metadata(dir).map_err(|source| Error::Enumeration {
        path: dir.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(Error::Config(format!(
            "document path is not a directory: {}",
            dir.display()
        )));
    }

    let mut paths = Vec::new();
    walk(dir, &mut paths)?;

    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(ordinal, path)| Document { path, ordinal })
        .collect())
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let read_dir = fs::read_dir(dir).map_err(|source| Error::Enumeration {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|source| Error::Enumeration {
            path: dir.to_path_buf(),
            source,
        })?;
        entries.push(entry);
    }
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type().map_err(|source| Error::Enumeration {
            path: path.clone(),
            source,
        })?;

        if file_type.is_dir() {
            walk(&path, out)?;
        } else if file_type.is_file() {
            out.push(path);
        }
    }

    Ok(())
}

/// Read the whole dictionary file
pub fn read_dictionary(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| Error::Dictionary {
        path: path.to_path_buf(),
        source,
    })
}

/// Open a document for streaming
pub fn open_document(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).map_err(|source| Error::Document {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_enumerate_recursive_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("b_sub/deeper")).unwrap();
        fs::write(root.join("c.txt"), "c").unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("b_sub/x.txt"), "x").unwrap();
        fs::write(root.join("b_sub/deeper/y.txt"), "y").unwrap();

        let docs = enumerate_documents(root).unwrap();
        let rel: Vec<_> = docs
            .iter()
            .map(|d| d.path.strip_prefix(root).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            rel,
            vec![
                PathBuf::from("a.txt"),
                PathBuf::from("b_sub/deeper/y.txt"),
                PathBuf::from("b_sub/x.txt"),
                PathBuf::from("c.txt"),
            ]
        );
        for (i, doc) in docs.iter().enumerate() {
            assert_eq!(doc.ordinal, i);
        }
    }

    #[test]
    fn test_enumerate_empty_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(enumerate_documents(temp_dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_enumerate_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let err = enumerate_documents(&temp_dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::Enumeration { .. }));
    }

    #[test]
    fn test_enumerate_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("f.txt");
        fs::write(&file, "x").unwrap();
        assert!(matches!(enumerate_documents(&file).unwrap_err(), Error::Config(_)));
    }

    #[test]
    fn test_read_dictionary() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dict.txt");
        fs::write(&path, "a\nb\n").unwrap();
        assert_eq!(read_dictionary(&path).unwrap(), b"a\nb\n");

        let err = read_dictionary(&temp_dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, Error::Dictionary { .. }));
    }

    #[test]
    fn test_open_missing_document() {
        let temp_dir = TempDir::new().unwrap();
        let err = open_document(&temp_dir.path().join("gone.txt")).unwrap_err();
        assert!(matches!(err, Error::Document { .. }));
    }
}
