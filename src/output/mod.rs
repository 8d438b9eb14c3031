//! Results output
//!
//! Persists the finished result matrix in one of three formats and prints
//! the console run summary.

pub mod csv;
pub mod json;
pub mod text;

use crate::config::OutputFormat;
use crate::corpus::Document;
use crate::error::Error;
use crate::profile::ProfileVector;
use crate::Result;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// A complete run's results, borrowed for writing
#[derive(Debug, Clone, Copy)]
pub struct ResultSet<'a> {
    /// Documents in ordinal order
    pub documents: &'a [Document],
    /// Dictionary words in index order
    pub words: &'a [String],
    /// One profile per document, in ordinal order
    pub profiles: &'a [ProfileVector],
}

impl ResultSet<'_> {
    pub fn dict_size(&self) -> usize {
        self.words.len()
    }

    /// Documents paired with their profiles
    pub fn rows(&self) -> impl Iterator<Item = (&Document, &ProfileVector)> {
        self.documents.iter().zip(self.profiles.iter())
    }
}

/// Write `results` to `path` in `format`
pub fn write_results(path: &Path, format: OutputFormat, results: &ResultSet<'_>) -> Result<()> {
    let output_err = |source: io::Error| Error::Output {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(output_err)?;
    let mut writer = BufWriter::new(file);

    let written = match format {
        OutputFormat::Text => text::write_text(&mut writer, results),
        OutputFormat::Csv => csv::write_csv(&mut writer, results),
        OutputFormat::Json => json::write_json(&mut writer, results),
    };
    written.map_err(output_err)?;

    writer.flush().map_err(output_err)
}
