//! Process group
//!
//! A fixed set of ranks, each running as an isolated task with a private
//! mailbox. Ranks exchange framed byte messages only; nothing mutable is
//! shared. Rank 0 is the coordinator, ranks `1..size` are workers.
//!
//! # Matching
//!
//! Receives and probes select by source (`Source::Any` or a rank) and tag
//! (`TagMatch::Any` or a tag). Frames that arrive before a matching receive is
//! posted are buffered and matched later in arrival order, so frames from one
//! sender to one receiver are always consumed in send order.
//!
//! # Worker sub-communicator
//!
//! The workers also share a second communicator with its own mailboxes.
//! Collective traffic (the dictionary broadcast) travels only there and can
//! never be matched by a world receive. The coordinator is not a member.

use crate::distributed::protocol::{encode_frame, FrameHeader, ProtocolError, HEADER_LEN, MAX_PAYLOAD_LEN};
use crate::error::{try_reserve, Error};
use crate::Result;
use std::collections::VecDeque;
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Rank within a communicator
pub type Rank = usize;

/// World rank of the coordinator
pub const COORDINATOR: Rank = 0;

/// Tags reserved for the broadcast collective
const BCAST_LEN_TAG: u8 = 0xF0;
const BCAST_DATA_TAG: u8 = 0xF1;

/// Source selector for receive and probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Any,
    Rank(Rank),
}

/// Tag selector for receive and probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMatch {
    Any,
    Tag(u8),
}

/// Result of a probe: who sent what, and how long the payload is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub source: Rank,
    pub tag: u8,
    pub len: usize,
}

/// A received message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub source: Rank,
    pub tag: u8,
    pub payload: Vec<u8>,
}

#[derive(Debug)]
struct Packet {
    source: Rank,
    frame: Vec<u8>,
}

impl Packet {
    fn header(&self) -> Result<FrameHeader> {
        Ok(FrameHeader::parse(&self.frame)?)
    }

    fn matches(&self, source: Source, tag: TagMatch) -> Result<bool> {
        let source_ok = match source {
            Source::Any => true,
            Source::Rank(r) => self.source == r,
        };
        let tag_ok = match tag {
            TagMatch::Any => true,
            TagMatch::Tag(t) => self.header()?.tag == t,
        };
        Ok(source_ok && tag_ok)
    }
}

/// One rank's endpoint on a communicator
pub struct Communicator {
    rank: Rank,
    peers: Vec<mpsc::UnboundedSender<Packet>>,
    inbox: mpsc::UnboundedReceiver<Packet>,
    /// Arrived but not yet matched
    pending: VecDeque<Packet>,
}

impl Communicator {
    /// Build a fully connected set of `size` endpoints
    fn connect(size: usize) -> Vec<Communicator> {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..size).map(|_| mpsc::unbounded_channel()).unzip();

        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| Communicator {
                rank,
                peers: senders.clone(),
                inbox,
                pending: VecDeque::new(),
            })
            .collect()
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.peers.len()
    }

    /// Send `payload` to `dest` under `tag`
    ///
    /// Never blocks; the frame is queued in the destination mailbox.
    pub fn send(&self, dest: Rank, tag: u8, payload: &[u8]) -> Result<()> {
        let peer = self
            .peers
            .get(dest)
            .ok_or_else(|| Error::Config(format!("rank {} out of range (size {})", dest, self.size())))?;
        let frame = encode_frame(tag, payload)?;
        peer.send(Packet {
            source: self.rank,
            frame,
        })
        .map_err(|_| Error::Disconnected(dest))
    }

    /// Wait for a matching frame and report its header without consuming it
    pub async fn probe(&mut self, source: Source, tag: TagMatch) -> Result<Status> {
        let idx = self.wait_for(source, tag).await?;
        let packet = &self.pending[idx];
        let header = packet.header()?;
        Ok(Status {
            source: packet.source,
            tag: header.tag,
            len: header.len,
        })
    }

    /// Wait for a matching frame and consume it
    ///
    /// The payload buffer is sized from the frame header before it is filled.
    pub async fn recv(&mut self, source: Source, tag: TagMatch) -> Result<Envelope> {
        let idx = self.wait_for(source, tag).await?;
        let packet = self
            .pending
            .remove(idx)
            .ok_or(Error::Disconnected(self.rank))?;
        let header = packet.header()?;

        let mut payload = Vec::new();
        try_reserve(&mut payload, header.len, "receive buffer")?;
        payload.extend_from_slice(&packet.frame[HEADER_LEN..HEADER_LEN + header.len]);

        Ok(Envelope {
            source: packet.source,
            tag: header.tag,
            payload,
        })
    }

    /// Index in `pending` of the first frame matching the selectors
    async fn wait_for(&mut self, source: Source, tag: TagMatch) -> Result<usize> {
        for (idx, packet) in self.pending.iter().enumerate() {
            if packet.matches(source, tag)? {
                return Ok(idx);
            }
        }
        loop {
            let packet = self
                .inbox
                .recv()
                .await
                .ok_or(Error::Disconnected(self.rank))?;
            let matched = packet.matches(source, tag)?;
            self.pending.push_back(packet);
            if matched {
                return Ok(self.pending.len() - 1);
            }
        }
    }

    /// Broadcast `buf` from `root` to every member
    ///
    /// Two phases: the root sends the byte length, then the bytes in frames of
    /// at most `MAX_PAYLOAD_LEN`. Other members reserve the buffer from the
    /// announced length before receiving the data. On return every member's
    /// `buf` holds the root's bytes.
    pub async fn broadcast(&mut self, root: Rank, buf: &mut Vec<u8>) -> Result<()> {
        self.broadcast_chunked(root, buf, MAX_PAYLOAD_LEN).await
    }

    async fn broadcast_chunked(&mut self, root: Rank, buf: &mut Vec<u8>, chunk_len: usize) -> Result<()> {
        if self.rank == root {
            let len = (buf.len() as u64).to_le_bytes();
            for dest in (0..self.size()).filter(|&r| r != root) {
                self.send(dest, BCAST_LEN_TAG, &len)?;
            }
            for chunk in buf.chunks(chunk_len.max(1)) {
                for dest in (0..self.size()).filter(|&r| r != root) {
                    self.send(dest, BCAST_DATA_TAG, chunk)?;
                }
            }
            return Ok(());
        }

        let len_msg = self.recv(Source::Rank(root), TagMatch::Tag(BCAST_LEN_TAG)).await?;
        let len_bytes: [u8; 8] = len_msg.payload.as_slice().try_into().map_err(|_| {
            ProtocolError::Collective(format!(
                "broadcast length frame has {} bytes, expected 8",
                len_msg.payload.len()
            ))
        })?;
        let len = usize::try_from(u64::from_le_bytes(len_bytes)).map_err(|_| Error::ResourceExhausted {
            what: "broadcast buffer",
            bytes: usize::MAX,
        })?;

        buf.clear();
        try_reserve(buf, len, "broadcast buffer")?;

        while buf.len() < len {
            let data = self.recv(Source::Rank(root), TagMatch::Tag(BCAST_DATA_TAG)).await?;
            if data.payload.is_empty() || buf.len() + data.payload.len() > len {
                return Err(ProtocolError::Collective(format!(
                    "broadcast announced {} bytes but delivered at least {}",
                    len,
                    buf.len() + data.payload.len()
                ))
                .into());
            }
            buf.extend_from_slice(&data.payload);
        }
        Ok(())
    }
}

/// Role of a worker in the dictionary synchronization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerRole {
    /// Reads the dictionary file, broadcasts it, reports its size
    DesignatedLoader,
    /// Receives the dictionary from the loader
    Follower,
}

/// Everything a worker rank is handed at startup
pub struct WorkerContext {
    /// World communicator (talks to the coordinator)
    pub world: Communicator,
    /// Worker-only communicator (dictionary broadcast)
    pub workers: Communicator,
    pub role: WorkerRole,
}

impl WorkerContext {
    /// Sub-communicator rank of the designated loader
    pub const LOADER: Rank = 0;
}

enum RankOutput<C, W> {
    Coordinator(C),
    Worker(Rank, W),
}

/// A formed process group, ready to run
pub struct ProcessGroup {
    coordinator: Communicator,
    workers: Vec<WorkerContext>,
}

impl ProcessGroup {
    /// Form a group of `size` ranks (coordinator + `size - 1` workers)
    ///
    /// Worker roles are fixed here: the worker with sub-communicator rank 0
    /// is the designated loader, every other worker follows.
    pub fn new(size: usize) -> Result<Self> {
        if size < 2 {
            return Err(Error::Config(format!(
                "need at least 2 processes (1 coordinator + 1 worker), got {}",
                size
            )));
        }

        let mut world = Communicator::connect(size).into_iter();
        let coordinator = world.next().ok_or(Error::Disconnected(COORDINATOR))?;
        let subgroup = Communicator::connect(size - 1);

        let workers = world
            .zip(subgroup)
            .map(|(world, workers)| {
                let role = if workers.rank() == WorkerContext::LOADER {
                    WorkerRole::DesignatedLoader
                } else {
                    WorkerRole::Follower
                };
                WorkerContext { world, workers, role }
            })
            .collect();

        Ok(Self { coordinator, workers })
    }

    /// Total number of ranks
    pub fn size(&self) -> usize {
        self.workers.len() + 1
    }

    /// Run every rank to completion
    ///
    /// The first rank to fail aborts all others and its error becomes the
    /// result. On success returns the coordinator's output and the worker
    /// outputs in world-rank order.
    pub async fn run<CF, CFut, CO, WF, WFut, WO>(
        self,
        coordinator: CF,
        mut worker: WF,
    ) -> Result<(CO, Vec<WO>)>
    where
        CF: FnOnce(Communicator) -> CFut,
        CFut: Future<Output = Result<CO>> + Send + 'static,
        CO: Send + 'static,
        WF: FnMut(WorkerContext) -> WFut,
        WFut: Future<Output = Result<WO>> + Send + 'static,
        WO: Send + 'static,
    {
        let worker_count = self.workers.len();
        let mut tasks: JoinSet<(Rank, Result<RankOutput<CO, WO>>)> = JoinSet::new();

        let coord_fut = coordinator(self.coordinator);
        tasks.spawn(async move { (COORDINATOR, coord_fut.await.map(RankOutput::Coordinator)) });

        for ctx in self.workers {
            let rank = ctx.world.rank();
            let fut = worker(ctx);
            tasks.spawn(async move { (rank, fut.await.map(|out| RankOutput::Worker(rank, out))) });
        }

        let mut coord_out = None;
        let mut worker_outs: Vec<Option<WO>> = (0..worker_count).map(|_| None).collect();

        while let Some(joined) = tasks.join_next().await {
            let (rank, outcome) = match joined {
                Ok(pair) => pair,
                Err(join_err) => {
                    error!("rank task failed: {}; aborting process group", join_err);
                    tasks.abort_all();
                    return Err(Error::RankFailed(join_err.to_string()));
                }
            };
            match outcome {
                Ok(RankOutput::Coordinator(out)) => {
                    debug!(rank, "coordinator finished");
                    coord_out = Some(out);
                }
                Ok(RankOutput::Worker(r, out)) => {
                    debug!(rank = r, "worker finished");
                    worker_outs[r - 1] = Some(out);
                }
                Err(err) => {
                    error!(rank, kind = err.kind(), "{}; aborting process group", err);
                    tasks.abort_all();
                    return Err(err);
                }
            }
        }

        let coord_out =
            coord_out.ok_or_else(|| Error::RankFailed("coordinator produced no result".to_string()))?;
        let worker_outs = worker_outs
            .into_iter()
            .enumerate()
            .map(|(i, out)| out.ok_or_else(|| Error::RankFailed(format!("rank {} produced no result", i + 1))))
            .collect::<Result<Vec<_>>>()?;

        Ok((coord_out, worker_outs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_needs_two_ranks() {
        assert!(matches!(ProcessGroup::new(1), Err(Error::Config(_))));
        assert!(matches!(ProcessGroup::new(0), Err(Error::Config(_))));
        assert_eq!(ProcessGroup::new(2).unwrap().size(), 2);
    }

    #[test]
    fn test_roles_fixed_at_formation() {
        let group = ProcessGroup::new(4).unwrap();
        let roles: Vec<_> = group.workers.iter().map(|w| w.role).collect();
        assert_eq!(
            roles,
            vec![WorkerRole::DesignatedLoader, WorkerRole::Follower, WorkerRole::Follower]
        );
        for (i, w) in group.workers.iter().enumerate() {
            assert_eq!(w.world.rank(), i + 1);
            assert_eq!(w.workers.rank(), i);
            assert_eq!(w.world.size(), 4);
            assert_eq!(w.workers.size(), 3);
        }
    }

    #[tokio::test]
    async fn test_probe_does_not_consume() {
        let mut comms = Communicator::connect(2);
        let mut b = comms.pop().unwrap();
        let a = comms.pop().unwrap();

        a.send(1, 7, b"hello").unwrap();

        let status = b.probe(Source::Rank(0), TagMatch::Tag(7)).await.unwrap();
        assert_eq!(status, Status { source: 0, tag: 7, len: 5 });

        let again = b.probe(Source::Any, TagMatch::Any).await.unwrap();
        assert_eq!(again, status);

        let env = b.recv(Source::Any, TagMatch::Any).await.unwrap();
        assert_eq!(env.payload, b"hello");
        assert_eq!(env.source, 0);
    }

    #[tokio::test]
    async fn test_zero_length_frame() {
        let mut comms = Communicator::connect(2);
        let mut b = comms.pop().unwrap();
        let a = comms.pop().unwrap();

        a.send(1, 1, b"").unwrap();
        let status = b.probe(Source::Rank(0), TagMatch::Tag(1)).await.unwrap();
        assert_eq!(status.len, 0);
        assert!(b.recv(Source::Rank(0), TagMatch::Tag(1)).await.unwrap().payload.is_empty());
    }

    #[tokio::test]
    async fn test_tag_matching_buffers_others() {
        let mut comms = Communicator::connect(3);
        let mut c = comms.pop().unwrap();
        let b = comms.pop().unwrap();
        let a = comms.pop().unwrap();

        a.send(2, 3, b"a-first").unwrap();
        b.send(2, 3, b"b-first").unwrap();
        a.send(2, 0, b"size").unwrap();
        a.send(2, 3, b"a-second").unwrap();

        // Selective receive skips ahead without losing anything
        let env = c.recv(Source::Any, TagMatch::Tag(0)).await.unwrap();
        assert_eq!(env.payload, b"size");

        let rest: Vec<Vec<u8>> = vec![
            c.recv(Source::Any, TagMatch::Any).await.unwrap().payload,
            c.recv(Source::Any, TagMatch::Any).await.unwrap().payload,
            c.recv(Source::Any, TagMatch::Any).await.unwrap().payload,
        ];
        assert_eq!(rest, vec![b"a-first".to_vec(), b"b-first".to_vec(), b"a-second".to_vec()]);
    }

    #[tokio::test]
    async fn test_source_matching_preserves_per_sender_order() {
        let mut comms = Communicator::connect(3);
        let mut c = comms.pop().unwrap();
        let b = comms.pop().unwrap();
        let a = comms.pop().unwrap();

        for i in 0..5u8 {
            a.send(2, 9, &[i]).unwrap();
            b.send(2, 9, &[100 + i]).unwrap();
        }
        for i in 0..5u8 {
            assert_eq!(c.recv(Source::Rank(1), TagMatch::Any).await.unwrap().payload, vec![100 + i]);
        }
        for i in 0..5u8 {
            assert_eq!(c.recv(Source::Rank(0), TagMatch::Any).await.unwrap().payload, vec![i]);
        }
    }

    #[tokio::test]
    async fn test_send_out_of_range() {
        let comms = Communicator::connect(2);
        assert!(comms[0].send(5, 0, b"").is_err());
    }

    #[tokio::test]
    async fn test_broadcast_delivers_identical_bytes() {
        let comms = Communicator::connect(4);
        let dictionary = b"alpha beta\ngamma\n".to_vec();

        let mut handles = Vec::new();
        for mut comm in comms {
            let mut buf = if comm.rank() == 0 { dictionary.clone() } else { Vec::new() };
            handles.push(tokio::spawn(async move {
                comm.broadcast(0, &mut buf).await.unwrap();
                buf
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), dictionary);
        }
    }

    #[tokio::test]
    async fn test_broadcast_larger_than_one_frame() {
        let comms = Communicator::connect(3);
        let dictionary: Vec<u8> = (0..100u8).collect();

        let mut handles = Vec::new();
        for mut comm in comms {
            let mut buf = if comm.rank() == 0 { dictionary.clone() } else { Vec::new() };
            handles.push(tokio::spawn(async move {
                comm.broadcast_chunked(0, &mut buf, 7).await.unwrap();
                buf
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), dictionary);
        }
    }

    #[tokio::test]
    async fn test_broadcast_overlong_data_rejected() {
        let mut comms = Communicator::connect(2);
        let mut b = comms.pop().unwrap();
        let a = comms.pop().unwrap();

        a.send(1, BCAST_LEN_TAG, &2u64.to_le_bytes()).unwrap();
        a.send(1, BCAST_DATA_TAG, b"abc").unwrap();

        let mut buf = Vec::new();
        let err = b.broadcast(0, &mut buf).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(ProtocolError::Collective(_))));
    }

    #[tokio::test]
    async fn test_broadcast_empty_buffer() {
        let comms = Communicator::connect(2);
        let mut handles = Vec::new();
        for mut comm in comms {
            handles.push(tokio::spawn(async move {
                let mut buf = if comm.rank() == 0 { Vec::new() } else { b"stale".to_vec() };
                comm.broadcast(0, &mut buf).await.unwrap();
                buf
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_run_collects_outputs_in_rank_order() {
        let group = ProcessGroup::new(4).unwrap();
        let (coord, workers) = group
            .run(
                |mut comm| async move {
                    let mut seen = Vec::new();
                    for _ in 1..comm.size() {
                        seen.push(comm.recv(Source::Any, TagMatch::Any).await?.source);
                    }
                    seen.sort();
                    Ok::<_, Error>(seen)
                },
                |ctx| async move {
                    ctx.world.send(COORDINATOR, 3, b"")?;
                    Ok::<_, Error>((ctx.world.rank(), ctx.role))
                },
            )
            .await
            .unwrap();

        assert_eq!(coord, vec![1, 2, 3]);
        assert_eq!(
            workers,
            vec![
                (1, WorkerRole::DesignatedLoader),
                (2, WorkerRole::Follower),
                (3, WorkerRole::Follower)
            ]
        );
    }

    #[tokio::test]
    async fn test_run_aborts_group_on_first_failure() {
        let group = ProcessGroup::new(3).unwrap();
        let result = group
            .run(
                |mut comm| async move {
                    // Would wait forever without the abort
                    while comm.recv(Source::Any, TagMatch::Any).await.is_ok() {}
                    Ok::<(), Error>(())
                },
                |ctx| async move {
                    if ctx.role == WorkerRole::Follower {
                        return Err(Error::Config("boom".to_string()));
                    }
                    Ok::<(), Error>(())
                },
            )
            .await;

        match result {
            Err(Error::Config(msg)) => assert_eq!(msg, "boom"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
