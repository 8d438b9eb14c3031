//! CSV output formatting
//!
//! One header row (`document` followed by the dictionary words in index
//! order), then one row per document. Fields are quoted per RFC 4180 when
//! they contain a comma, a quote or a line break.

use super::ResultSet;
use std::borrow::Cow;
use std::io::{self, Write};

/// Write the result set as CSV
pub fn write_csv<W: Write>(w: &mut W, results: &ResultSet<'_>) -> io::Result<()> {
    write!(w, "document")?;
    for word in results.words {
        write!(w, ",{}", escape_field(word))?;
    }
    writeln!(w)?;

    for (doc, vector) in results.rows() {
        write!(w, "{}", escape_field(&doc.name()))?;
        for count in vector {
            write!(w, ",{}", count)?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Quote a field if it needs it
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::sample;

    #[test]
    fn test_csv_layout() {
        let (documents, words, profiles) = sample();
        let results = ResultSet {
            documents: &documents,
            words: &words,
            profiles: &profiles,
        };
        let mut out = Vec::new();
        write_csv(&mut out, &results).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "document,a,b,c\ndocs/d0.txt,2,1,0\ndocs/d1.txt,0,0,1\n"
        );
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
