//! Term dictionary
//!
//! Maps dictionary words to profile-vector positions. Every worker builds its
//! own table from the same broadcast bytes, so index assignment must depend
//! only on those bytes: a word's index is the order in which it is first seen
//! during a single front-to-back scan. Hash iteration order is never consulted.

pub mod tokenizer;

use std::collections::HashMap;

/// Word → index table built once from dictionary text
#[derive(Debug, Clone, Default)]
pub struct HashTable {
    index: HashMap<Box<[u8]>, usize>,
    /// Words in index order
    words: Vec<Box<[u8]>>,
}

impl HashTable {
    /// Build the table from raw dictionary text
    ///
    /// Duplicate words keep the index of their first occurrence. Empty text
    /// produces an empty table.
    pub fn build(text: &[u8]) -> Self {
        let mut index: HashMap<Box<[u8]>, usize> = HashMap::new();
        let mut words = Vec::new();

        for token in tokenizer::tokens(text) {
            if index.contains_key(token) {
                continue;
            }
            let word: Box<[u8]> = token.into();
            index.insert(word.clone(), words.len());
            words.push(word);
        }

        Self { index, words }
    }

    /// Number of distinct words (the profile vector length)
    pub fn size(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Index of `word`, or `None` if it is not in the dictionary
    #[inline]
    pub fn lookup(&self, word: &[u8]) -> Option<usize> {
        self.index.get(word).copied()
    }

    /// Word at `index`
    pub fn word(&self, index: usize) -> Option<&[u8]> {
        self.words.get(index).map(|w| &w[..])
    }

    /// Entries in index order
    pub fn entries(&self) -> impl Iterator<Item = DictionaryEntry<'_>> {
        self.words
            .iter()
            .enumerate()
            .map(|(index, word)| DictionaryEntry { word, index })
    }

    /// Words in index order, lossily decoded for display
    pub fn words_lossy(&self) -> Vec<String> {
        self.words
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }
}

/// One dictionary word and its profile-vector position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictionaryEntry<'a> {
    pub word: &'a [u8],
    pub index: usize,
}
