//! JSON output formatting

use super::ResultSet;
use serde::Serialize;
use std::io::{self, Write};

/// Top-level JSON results document
#[derive(Debug, Serialize)]
pub struct JsonResults<'a> {
    /// RFC 3339 UTC timestamp
    pub generated_at: String,
    pub host: Option<String>,
    pub dict_size: usize,
    pub dictionary: &'a [String],
    pub profiles: Vec<JsonProfile<'a>>,
}

/// One document's profile
#[derive(Debug, Serialize)]
pub struct JsonProfile<'a> {
    pub ordinal: usize,
    pub document: String,
    pub vector: &'a [u32],
}

impl<'a> JsonResults<'a> {
    pub fn new(results: &ResultSet<'a>) -> Self {
        let profiles = results
            .documents
            .iter()
            .zip(results.profiles.iter())
            .map(|(doc, vector)| JsonProfile {
                ordinal: doc.ordinal,
                document: doc.name(),
                vector: vector.as_slice(),
            })
            .collect();

        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            host: local_hostname(),
            dict_size: results.dict_size(),
            dictionary: results.words,
            profiles,
        }
    }
}

/// Write the result set as pretty-printed JSON
pub fn write_json<W: Write>(w: &mut W, results: &ResultSet<'_>) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *w, &JsonResults::new(results))?;
    writeln!(w)
}

fn local_hostname() -> Option<String> {
    hostname::get().ok()?.into_string().ok()
}
