//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.

pub mod cli;
pub mod toml;
pub mod validator;

use clap::ValueEnum;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Complete run configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory of documents to profile
    pub documents: PathBuf,
    /// Dictionary file
    pub dictionary: PathBuf,
    /// Where results are written
    pub output_path: PathBuf,
    pub workers: WorkerConfig,
    pub output: OutputConfig,
}

/// Settings that may come from a TOML file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Process group sizing
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Ranks in the process group, coordinator included
    #[serde(default = "default_processes")]
    pub processes: usize,
}

fn default_processes() -> usize {
    num_cpus::get() + 1
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            processes: default_processes(),
        }
    }
}

/// Results output settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Explicit format; inferred from the output path when absent
    #[serde(default)]
    pub format: Option<OutputFormat>,
    /// Suppress the console run summary
    #[serde(default)]
    pub quiet: bool,
}

/// Results file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One line per document: path then counters
    Text,
    /// Header of dictionary words, one row per document
    Csv,
    /// Pretty-printed JSON document with run metadata
    Json,
}

impl OutputFormat {
    /// Guess the format from a file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(OutputFormat::Csv),
            "json" => Some(OutputFormat::Json),
            "txt" | "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl Config {
    /// Configuration with default worker and output settings
    pub fn new(documents: PathBuf, dictionary: PathBuf, output_path: PathBuf) -> Self {
        Self {
            documents,
            dictionary,
            output_path,
            workers: WorkerConfig::default(),
            output: OutputConfig::default(),
        }
    }

    /// Effective results format
    pub fn format(&self) -> OutputFormat {
        self.output
            .format
            .or_else(|| OutputFormat::from_extension(&self.output_path))
            .unwrap_or(OutputFormat::Text)
    }

    /// Number of worker ranks
    pub fn worker_count(&self) -> usize {
        self.workers.processes.saturating_sub(1)
    }
}
