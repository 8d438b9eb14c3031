//! Document profiling
//!
//! A profile is a vector of per-word occurrence counters, one slot per
//! dictionary word. Counters saturate at `u32::MAX`.

use crate::corpus;
use crate::dictionary::{tokenizer, HashTable};
use crate::error::{try_reserve, Error};
use crate::Result;
use std::io::BufRead;
use std::path::Path;

/// Occurrence counter type
pub type Counter = u32;

/// Per-document counter vector, indexed by dictionary position
pub type ProfileVector = Vec<Counter>;

/// Profile the document at `path`
pub fn compute(path: &Path, table: &HashTable, dict_size: usize) -> Result<ProfileVector> {
    let reader = corpus::open_document(path)?;
    compute_from_reader(reader, table, dict_size).map_err(|err| match err {
        Error::Document { source, .. } => Error::Document {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

/// Profile content read from `reader`, one line at a time
pub fn compute_from_reader<R: BufRead>(
    mut reader: R,
    table: &HashTable,
    dict_size: usize,
) -> Result<ProfileVector> {
    let mut profile: ProfileVector = Vec::new();
    try_reserve(&mut profile, dict_size, "profile vector")?;
    profile.resize(dict_size, 0);

    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .map_err(|source| Error::Document {
                path: Default::default(),
                source,
            })?;
        if n == 0 {
            break;
        }
        count_line(&mut profile, table, &line);
    }

    Ok(profile)
}

/// Add one line's dictionary words to `profile`
fn count_line(profile: &mut [Counter], table: &HashTable, line: &[u8]) {
    for token in tokenizer::tokens(line) {
        if let Some(slot) = table.lookup(token).and_then(|i| profile.get_mut(i)) {
            *slot = slot.saturating_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn profile_of(dict: &str, doc: &str) -> ProfileVector {
        let table = HashTable::build(dict.as_bytes());
        compute_from_reader(Cursor::new(doc.as_bytes()), &table, table.size()).unwrap()
    }

    #[test]
    fn test_counts() {
        assert_eq!(profile_of("a b c", "a a b"), vec![2, 1, 0]);
        assert_eq!(profile_of("a b c", "c"), vec![0, 0, 1]);
    }

    #[test]
    fn test_empty_document_all_zero() {
        assert_eq!(profile_of("one\ntwo\nthree\nfour", ""), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_unknown_words_ignored() {
        assert_eq!(profile_of("one two", "three four five\nsix"), vec![0, 0]);
    }

    #[test]
    fn test_each_word_once_all_ones() {
        let dict = "red\ngreen\nblue\nyellow\n";
        assert_eq!(profile_of(dict, "yellow blue\ngreen red"), vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_tokens_across_lines() {
        assert_eq!(profile_of("x y", "x\n\n  y x\r\ny"), vec![2, 2]);
    }

    #[test]
    fn test_counters_saturate() {
        let table = HashTable::build(b"a b");
        let mut profile: ProfileVector = vec![Counter::MAX - 1, 7];
        count_line(&mut profile, &table, b"a a a b");
        assert_eq!(profile, vec![Counter::MAX, 8]);
    }

    #[test]
    fn test_empty_dictionary() {
        assert!(profile_of("", "a b c").is_empty());
    }

    #[test]
    fn test_compute_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.txt");
        fs::write(&path, "b b b a").unwrap();
        let table = HashTable::build(b"a b");
        assert_eq!(compute(&path, &table, table.size()).unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_compute_unreadable_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.txt");
        let table = HashTable::build(b"a");
        match compute(&path, &table, 1).unwrap_err() {
            Error::Document { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
