//! CLI argument parsing using clap

use super::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

/// docprofile - profile documents against a dictionary across a worker pool
#[derive(Parser, Debug)]
#[command(name = "docprofile")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory containing the documents to profile
    #[arg(value_name = "DOCUMENT_DIR")]
    pub documents: PathBuf,

    /// Dictionary file (whitespace-separated words)
    #[arg(value_name = "DICTIONARY")]
    pub dictionary: PathBuf,

    /// Results file
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Process group size including the coordinator (default: CPUs + 1)
    #[arg(short = 'n', long, env = "DOCPROFILE_PROCESSES")]
    pub processes: Option<usize>,

    /// Results format (default: inferred from the output extension)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// TOML configuration file; command-line values take precedence
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Validate inputs, list documents and exit without profiling
    #[arg(long)]
    pub dry_run: bool,

    /// Suppress the run summary
    #[arg(long)]
    pub quiet: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(n) = self.processes {
            if n < 2 {
                anyhow::bail!(
                    "--processes must be at least 2 (1 coordinator + 1 worker), got {}",
                    n
                );
            }
        }
        Ok(())
    }
}
