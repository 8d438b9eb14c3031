//! Configuration validation
//!
//! Runs before anything is spawned, so every failure here is a clean
//! rejection.

use super::*;
use crate::error::Error;
use crate::Result;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_workers(&config.workers)?;
    validate_inputs(config)?;
    validate_output(config)?;
    Ok(())
}

/// Validate process group sizing
pub fn validate_workers(workers: &WorkerConfig) -> Result<()> {
    if workers.processes < 2 {
        return Err(Error::Config(format!(
            "processes must be at least 2 (1 coordinator + 1 worker), got {}",
            workers.processes
        )));
    }
    Ok(())
}

/// Validate that the document directory and dictionary exist
pub fn validate_inputs(config: &Config) -> Result<()> {
    if !config.documents.is_dir() {
        return Err(Error::Config(format!(
            "document directory does not exist or is not a directory: {}",
            config.documents.display()
        )));
    }
    if !config.dictionary.is_file() {
        return Err(Error::Config(format!(
            "dictionary file does not exist: {}",
            config.dictionary.display()
        )));
    }
    Ok(())
}

/// Validate the results path
pub fn validate_output(config: &Config) -> Result<()> {
    if config.output_path.is_dir() {
        return Err(Error::Config(format!(
            "output path is a directory: {}",
            config.output_path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn valid_config(dir: &tempfile::TempDir) -> Config {
        let docs = dir.path().join("docs");
        fs::create_dir(&docs).unwrap();
        let dict = dir.path().join("dict.txt");
        fs::write(&dict, "a b c").unwrap();
        let mut config = Config::new(docs, dict, dir.path().join("out.txt"));
        config.workers.processes = 3;
        config
    }

    #[test]
    fn test_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_config(&valid_config(&dir)).is_ok());
    }

    #[test]
    fn test_too_few_processes() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = valid_config(&dir);
        config.workers.processes = 1;
        assert!(matches!(validate_config(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = valid_config(&dir);
        config.dictionary = dir.path().join("missing.txt");
        assert!(matches!(validate_config(&config), Err(Error::Config(_))));

        let other = tempfile::tempdir().unwrap();
        let mut config = valid_config(&other);
        config.documents = config.dictionary.clone();
        assert!(matches!(validate_config(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_output_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = valid_config(&dir);
        config.output_path = dir.path().to_path_buf();
        assert!(matches!(validate_config(&config), Err(Error::Config(_))));
    }
}
