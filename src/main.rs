//! docprofile CLI entry point

use anyhow::{Context, Result};
use docprofile::config::{cli::Cli, toml::build_config, validator::validate_config, Config};
use docprofile::{corpus, distributed, output};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    cli.validate()?;
    init_tracing(cli.debug);

    println!("docprofile v{}", env!("CARGO_PKG_VERSION"));
    println!("Distributed document profiling");
    println!();

    let config = build_config(&cli)?;
    validate_config(&config).context("Invalid configuration")?;
    print_config(&config);

    if cli.dry_run {
        return dry_run(&config);
    }

    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?;

    let outcome = runtime
        .block_on(distributed::run(&config))
        .context("Profiling run failed")?;

    if !config.output.quiet {
        println!();
        output::text::print_summary(&outcome.report, &config.output_path, config.format());
    }

    Ok(())
}

/// Install the fmt subscriber; `RUST_LOG` overrides the default level
fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_config(config: &Config) {
    println!("Documents:  {}", config.documents.display());
    println!("Dictionary: {}", config.dictionary.display());
    println!("Output:     {} ({})", config.output_path.display(), config.format());
    println!(
        "Processes:  {} (1 coordinator + {} workers)",
        config.workers.processes,
        config.worker_count()
    );
    println!();
}

/// List what would be profiled and exit
fn dry_run(config: &Config) -> Result<()> {
    let documents = corpus::enumerate_documents(&config.documents)
        .with_context(|| format!("Failed to enumerate {}", config.documents.display()))?;

    println!("Dry run: {} documents would be profiled", documents.len());
    for doc in &documents {
        println!("  [{}] {}", doc.ordinal, doc.name());
    }
    Ok(())
}
