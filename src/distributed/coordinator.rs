//! Coordinator
//!
//! The coordinator:
//! - Enumerates documents while it waits for the dictionary size
//! - Hands out one document at a time to whichever worker asks
//! - Records returned profiles by ordinal
//! - Tells each worker to stop once the documents run out
//!
//! Work is never pushed ahead of a request. Every message a worker sends
//! (its initial EMPTY or a VECTOR) doubles as a request for the next
//! document, so faster workers naturally take more documents.

use crate::corpus::{self, Document};
use crate::distributed::group::{Communicator, Rank, Source};
use crate::distributed::protocol::{recv_message, send_message, Message, ProtocolError, Tag};
use crate::distributed::results::ResultMatrix;
use crate::error::Error;
use crate::profile::ProfileVector;
use crate::Result;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Where the coordinator gets its document list
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// Walk a directory at startup
    Directory(PathBuf),
    /// Use an already enumerated list
    List(Vec<Document>),
}

/// Statistics of one distribution run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Documents profiled
    pub documents: usize,
    /// Dictionary size reported by the designated loader
    pub dict_size: usize,
    /// Worker ranks in the group
    pub workers: usize,
    /// Termination messages sent (equals `workers` on success)
    pub terminated: usize,
    /// Documents handed to each worker, indexed by world rank - 1
    pub assigned_per_worker: Vec<usize>,
    /// Wall time from coordinator start to loop exit
    pub elapsed: Duration,
}

/// Everything the coordinator hands to the output stage
#[derive(Debug, Clone)]
pub struct CoordinatorOutput {
    pub documents: Vec<Document>,
    /// Profiles in ordinal order
    pub profiles: Vec<ProfileVector>,
    pub report: RunReport,
}

/// Rank 0 of the process group
pub struct Coordinator {
    comm: Communicator,
    source: DocumentSource,
}

impl Coordinator {
    pub fn new(comm: Communicator, source: DocumentSource) -> Self {
        Self { comm, source }
    }

    /// Run the distribution to completion
    pub async fn run(mut self) -> Result<CoordinatorOutput> {
        let start = Instant::now();
        let worker_count = self.comm.size() - 1;

        let (documents, dict_size) = self.startup().await?;
        info!(
            documents = documents.len(),
            dict_size,
            workers = worker_count,
            "starting distribution"
        );

        let mut matrix = ResultMatrix::new(documents.len(), dict_size)?;
        let mut assignment: HashMap<Rank, usize> = HashMap::with_capacity(worker_count);
        let mut joined: HashSet<Rank> = HashSet::with_capacity(worker_count);
        let mut assigned_per_worker = vec![0usize; worker_count];
        let mut assign_count = 0usize;
        let mut terminated = 0usize;

        while terminated < worker_count {
            let (src, msg) = recv_message(&mut self.comm, Source::Any, None).await?;

            match msg {
                Message::Vector(vector) => {
                    let ordinal = assignment.remove(&src).ok_or_else(|| ProtocolError::Unexpected {
                        tag: Tag::Vector,
                        source_rank: src,
                        reason: "no document outstanding".to_string(),
                    })?;
                    matrix.record(ordinal, vector)?;
                    debug!(worker = src, ordinal, "profile received");
                }
                Message::Empty => {
                    if !joined.insert(src) {
                        return Err(ProtocolError::Unexpected {
                            tag: Tag::Empty,
                            source_rank: src,
                            reason: "worker already registered".to_string(),
                        }
                        .into());
                    }
                    debug!(worker = src, "worker ready");
                }
                other => {
                    return Err(ProtocolError::Unexpected {
                        tag: other.tag(),
                        source_rank: src,
                        reason: "not valid during distribution".to_string(),
                    }
                    .into());
                }
            }

            if assign_count < documents.len() {
                let doc = &documents[assign_count];
                let name = doc.path.to_str().ok_or_else(|| {
                    ProtocolError::Encode(format!("document path is not UTF-8: {}", doc.path.display()))
                })?;
                send_message(&self.comm, src, &Message::FileName(name.to_string()))?;
                assignment.insert(src, assign_count);
                assigned_per_worker[src - 1] += 1;
                assign_count += 1;
            } else {
                send_message(&self.comm, src, &Message::terminate())?;
                terminated += 1;
                debug!(worker = src, terminated, "worker terminated");
            }
        }

        let profiles = matrix.into_rows()?;
        let report = RunReport {
            documents: documents.len(),
            dict_size,
            workers: worker_count,
            terminated,
            assigned_per_worker,
            elapsed: start.elapsed(),
        };
        info!(documents = report.documents, elapsed = ?report.elapsed, "distribution complete");

        Ok(CoordinatorOutput {
            documents,
            profiles,
            report,
        })
    }

    /// Enumerate documents and receive DICT_SIZE concurrently
    async fn startup(&mut self) -> Result<(Vec<Document>, usize)> {
        let source = std::mem::replace(&mut self.source, DocumentSource::List(Vec::new()));
        let comm = &mut self.comm;

        let enumerate = async move {
            match source {
                DocumentSource::List(documents) => Ok(documents),
                DocumentSource::Directory(dir) => {
                    tokio::task::spawn_blocking(move || corpus::enumerate_documents(&dir))
                        .await
                        .map_err(|e| Error::RankFailed(e.to_string()))
                        .and_then(|listed| listed)
                }
            }
        };

        let dict_size = async move {
            let (src, msg) = recv_message(comm, Source::Any, Some(Tag::DictSize)).await?;
            match msg {
                Message::DictSize(size) => {
                    debug!(worker = src, dict_size = size, "dictionary size received");
                    Ok::<_, Error>(size)
                }
                other => Err(Error::from(ProtocolError::Unexpected {
                    tag: other.tag(),
                    source_rank: src,
                    reason: "expected DICT_SIZE".to_string(),
                })),
            }
        };

        tokio::try_join!(enumerate, dict_size)
    }
}
