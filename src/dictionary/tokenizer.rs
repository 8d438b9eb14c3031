//! Whitespace tokenizer shared by the dictionary builder and the profiler
//!
//! Tokens are maximal runs of bytes that are not ASCII whitespace. Line breaks
//! are whitespace, so dictionary files with one word per line and files with
//! several words per line tokenize the same way.

/// Split `text` into tokens
pub fn tokens(text: &[u8]) -> impl Iterator<Item = &[u8]> {
    text.split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty())
}
