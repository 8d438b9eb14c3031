//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<ConfigFile> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<ConfigFile> {
    let config: ConfigFile = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with file settings (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, file: ConfigFile) -> Config {
    let mut config = Config {
        documents: cli.documents.clone(),
        dictionary: cli.dictionary.clone(),
        output_path: cli.output.clone(),
        workers: file.workers,
        output: file.output,
    };

    if let Some(processes) = cli.processes {
        config.workers.processes = processes;
    }
    if cli.format.is_some() {
        config.output.format = cli.format;
    }
    if cli.quiet {
        config.output.quiet = true;
    }

    config
}

/// Build the run configuration from the command line and optional config file
pub fn build_config(cli: &Cli) -> Result<Config> {
    let file = match &cli.config {
        Some(path) => parse_toml_file(path)?,
        None => ConfigFile::default(),
    };
    Ok(merge_cli_with_config(cli, file))
}
