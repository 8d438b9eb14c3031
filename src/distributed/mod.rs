//! Distributed profiling
//!
//! docprofile runs as a process group of one coordinator and a fixed pool of
//! workers that exchange framed messages only:
//!
//! - **Coordinator** (rank 0): enumerates documents, hands them out one at a
//!   time on demand, collects profiles by ordinal
//! - **Workers** (ranks 1..N): share the dictionary through a broadcast on
//!   their own sub-communicator, then profile documents until told to stop
//!
//! # Modules
//!
//! - `group`: ranks, mailboxes, probe/receive matching, broadcast, group abort
//! - `protocol`: message tags, payload encoding, framing
//! - `coordinator`: the distribution loop
//! - `worker`: the worker state machine
//! - `results`: the write-once result matrix

pub mod coordinator;
pub mod group;
pub mod protocol;
pub mod results;
pub mod worker;

pub use coordinator::{Coordinator, CoordinatorOutput, DocumentSource, RunReport};
pub use group::{Communicator, ProcessGroup, Rank, WorkerContext, WorkerRole, COORDINATOR};
pub use protocol::{Message, ProtocolError, Tag};
pub use results::ResultMatrix;
pub use worker::{Worker, WorkerReport};

use crate::config::{Config, OutputFormat};
use crate::corpus;
use crate::dictionary::HashTable;
use crate::output::{self, ResultSet};
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Result of a complete profiling run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: RunReport,
    pub workers: Vec<WorkerReport>,
}

/// Profile `source` against `dictionary` with a group of `processes` ranks
///
/// Returns the coordinator's output and every worker's report in rank order.
/// Nothing is written to disk.
pub async fn profile_documents(
    processes: usize,
    source: DocumentSource,
    dictionary: PathBuf,
) -> Result<(CoordinatorOutput, Vec<WorkerReport>)> {
    let group = ProcessGroup::new(processes)?;
    info!(processes = group.size(), "process group formed");

    group
        .run(
            move |comm| Coordinator::new(comm, source).run(),
            move |ctx| Worker::new(ctx, dictionary.clone()).run(),
        )
        .await
}

/// Run a complete profiling job and write its results
pub async fn run(config: &Config) -> Result<RunOutcome> {
    let (output, workers) = profile_documents(
        config.workers.processes,
        DocumentSource::Directory(config.documents.clone()),
        config.dictionary.clone(),
    )
    .await?;

    let format = config.format();
    let words = header_words(&config.dictionary, format, output.report.dict_size);
    let results = ResultSet {
        documents: &output.documents,
        words: &words,
        profiles: &output.profiles,
    };
    output::write_results(&config.output_path, format, &results)?;
    info!(path = %config.output_path.display(), %format, "results written");

    Ok(RunOutcome {
        report: output.report,
        workers,
    })
}

/// Dictionary words for output headers
///
/// Text output has no header, so the dictionary is only re-read for CSV and
/// JSON. If the file became unreadable or changed size since the broadcast,
/// positional names stand in for the words.
fn header_words(path: &Path, format: OutputFormat, dict_size: usize) -> Vec<String> {
    if format == OutputFormat::Text {
        return Vec::new();
    }

    match corpus::read_dictionary(path) {
        Ok(bytes) => {
            let table = HashTable::build(&bytes);
            if table.size() == dict_size {
                return table.words_lossy();
            }
            warn!(
                expected = dict_size,
                found = table.size(),
                "dictionary changed during the run; using positional column names"
            );
        }
        Err(err) => {
            warn!("{}; using positional column names", err);
        }
    }
    positional_words(dict_size)
}

fn positional_words(dict_size: usize) -> Vec<String> {
    (0..dict_size).map(|i| format!("word_{}", i)).collect()
}
