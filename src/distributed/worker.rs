//! Profiling worker
//!
//! Each worker rank:
//! - Announces itself to the coordinator (EMPTY)
//! - Takes part in the dictionary broadcast and builds its own table
//! - Reports the dictionary size (designated loader only)
//! - Profiles documents until it receives the zero-length FILE_NAME
//!
//! ```text
//! JOINING -> DICT_SYNC -> READY -> PROFILING -> READY ... -> DONE
//! ```

use crate::corpus;
use crate::dictionary::HashTable;
use crate::distributed::group::{Rank, Source, TagMatch, WorkerContext, WorkerRole, COORDINATOR};
use crate::distributed::protocol::{recv_message, send_message, Message, ProtocolError, Tag};
use crate::error::Error;
use crate::profile;
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Worker lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Joining,
    DictSync,
    Ready,
    Profiling,
    Done,
}

/// What a worker reports when it exits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub rank: Rank,
    pub role: WorkerRole,
    pub dict_size: usize,
    pub documents_profiled: usize,
}

/// One worker rank
pub struct Worker {
    ctx: WorkerContext,
    dictionary_path: PathBuf,
    state: WorkerState,
}

impl Worker {
    /// Create a worker
    ///
    /// `dictionary_path` is only read when the worker is the designated loader.
    pub fn new(ctx: WorkerContext, dictionary_path: PathBuf) -> Self {
        Self {
            ctx,
            dictionary_path,
            state: WorkerState::Joining,
        }
    }

    pub fn rank(&self) -> Rank {
        self.ctx.world.rank()
    }

    pub fn role(&self) -> WorkerRole {
        self.ctx.role
    }

    fn transition(&mut self, next: WorkerState) {
        debug!(rank = self.rank(), from = ?self.state, to = ?next, "worker state");
        self.state = next;
    }

    /// Run the worker to completion
    pub async fn run(mut self) -> Result<WorkerReport> {
        // Registration does not wait for the dictionary
        send_message(&self.ctx.world, COORDINATOR, &Message::Empty)?;

        self.transition(WorkerState::DictSync);
        let table = Arc::new(self.sync_dictionary().await?);
        let dict_size = table.size();

        if self.role() == WorkerRole::DesignatedLoader {
            if dict_size == 0 {
                warn!("dictionary {} contains no words", self.dictionary_path.display());
            }
            info!(rank = self.rank(), dict_size, "dictionary loaded and broadcast");
            send_message(&self.ctx.world, COORDINATOR, &Message::DictSize(dict_size))?;
        }

        let mut documents_profiled = 0;
        loop {
            self.transition(WorkerState::Ready);

            // Length decides whether this is work or the stop sentinel
            let status = self
                .ctx
                .world
                .probe(Source::Rank(COORDINATOR), TagMatch::Tag(Tag::FileName.as_u8()))
                .await?;
            let (_, msg) =
                recv_message(&mut self.ctx.world, Source::Rank(COORDINATOR), Some(Tag::FileName)).await?;

            let name = match msg {
                Message::FileName(name) => name,
                other => {
                    return Err(ProtocolError::Unexpected {
                        tag: other.tag(),
                        source_rank: COORDINATOR,
                        reason: "worker expects FILE_NAME only".to_string(),
                    }
                    .into())
                }
            };
            if status.len == 0 {
                break;
            }

            self.transition(WorkerState::Profiling);
            let path = PathBuf::from(name);
            debug!(rank = self.rank(), path = %path.display(), "profiling");

            let vector = {
                let table = Arc::clone(&table);
                tokio::task::spawn_blocking(move || profile::compute(&path, &table, dict_size))
                    .await
                    .map_err(|e| Error::RankFailed(e.to_string()))??
            };

            send_message(&self.ctx.world, COORDINATOR, &Message::Vector(vector))?;
            documents_profiled += 1;
        }

        self.transition(WorkerState::Done);
        debug!(rank = self.rank(), documents_profiled, "worker done");

        Ok(WorkerReport {
            rank: self.rank(),
            role: self.role(),
            dict_size,
            documents_profiled,
        })
    }

    /// Obtain the dictionary bytes through the worker broadcast and build the table
    async fn sync_dictionary(&mut self) -> Result<HashTable> {
        let mut buf = Vec::new();

        if self.role() == WorkerRole::DesignatedLoader {
            let path = self.dictionary_path.clone();
            buf = tokio::task::spawn_blocking(move || corpus::read_dictionary(&path))
                .await
                .map_err(|e| Error::RankFailed(e.to_string()))??;
            debug!(rank = self.rank(), bytes = buf.len(), "dictionary read");
        }

        self.ctx.workers.broadcast(WorkerContext::LOADER, &mut buf).await?;

        Ok(HashTable::build(&buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::group::ProcessGroup;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("dict.txt"), "a b c").unwrap();
        fs::write(dir.path().join("d0.txt"), "a a b").unwrap();
        dir
    }

    /// Waits for every EMPTY and the size, then sends `assign` to rank 1 and stops everyone
    async fn scripted_coordinator(
        mut comm: crate::distributed::group::Communicator,
        assign: Option<String>,
    ) -> Result<(usize, Vec<Message>)> {
        let workers = comm.size() - 1;
        let mut dict_size = None;
        let mut empties = 0;
        while dict_size.is_none() || empties < workers {
            match recv_message(&mut comm, Source::Any, None).await? {
                (_, Message::DictSize(n)) => dict_size = Some(n),
                (_, Message::Empty) => empties += 1,
                (_, other) => panic!("unexpected {:?}", other),
            }
        }

        let mut replies = Vec::new();
        if let Some(name) = assign {
            send_message(&comm, 1, &Message::FileName(name))?;
            replies.push(recv_message(&mut comm, Source::Rank(1), None).await?.1);
        }
        for rank in 1..=workers {
            send_message(&comm, rank, &Message::terminate())?;
        }
        Ok((dict_size.unwrap_or_default(), replies))
    }

    #[tokio::test]
    async fn test_workers_share_dictionary_and_profile() {
        let dir = fixture();
        let dict = dir.path().join("dict.txt");
        let doc = dir.path().join("d0.txt").to_str().unwrap().to_string();

        let group = ProcessGroup::new(3).unwrap();
        let ((dict_size, replies), reports) = group
            .run(
                move |comm| scripted_coordinator(comm, Some(doc)),
                move |ctx| Worker::new(ctx, dict.clone()).run(),
            )
            .await
            .unwrap();

        assert_eq!(dict_size, 3);
        assert_eq!(replies, vec![Message::Vector(vec![2, 1, 0])]);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].role, WorkerRole::DesignatedLoader);
        assert_eq!(reports[0].documents_profiled, 1);
        assert_eq!(reports[1].role, WorkerRole::Follower);
        assert_eq!(reports[1].documents_profiled, 0);
        assert!(reports.iter().all(|r| r.dict_size == 3));
    }

    #[tokio::test]
    async fn test_empty_dictionary() {
        let dir = fixture();
        let dict = dir.path().join("empty.txt");
        fs::write(&dict, "  \n\t").unwrap();

        let group = ProcessGroup::new(2).unwrap();
        let ((dict_size, _), reports) = group
            .run(
                |comm| scripted_coordinator(comm, None),
                move |ctx| Worker::new(ctx, dict.clone()).run(),
            )
            .await
            .unwrap();

        assert_eq!(dict_size, 0);
        assert_eq!(reports[0].dict_size, 0);
    }

    #[tokio::test]
    async fn test_unreadable_document_aborts() {
        let dir = fixture();
        let dict = dir.path().join("dict.txt");
        let missing = dir.path().join("missing.txt").to_str().unwrap().to_string();

        let group = ProcessGroup::new(2).unwrap();
        let err = group
            .run(
                move |comm| scripted_coordinator(comm, Some(missing)),
                move |ctx| Worker::new(ctx, dict.clone()).run(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Document { .. }));
    }

    #[tokio::test]
    async fn test_missing_dictionary_aborts() {
        let dir = fixture();
        let dict = dir.path().join("nope.txt");

        let group = ProcessGroup::new(3).unwrap();
        let err = group
            .run(
                |comm| scripted_coordinator(comm, None),
                move |ctx| Worker::new(ctx, dict.clone()).run(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Dictionary { .. }));
    }
}
