//! Coordinator/worker protocol
//!
//! Message definitions and framing shared by the coordinator and the workers.
//!
//! # Message Flow
//!
//! ```text
//! Coordinator                     Worker (designated loader)     Worker (follower)
//!     |                              |                              |
//!     |<------- EMPTY ---------------|                              |
//!     |<------------------------------------- EMPTY ----------------|
//!     |                              |== BCAST(len), BCAST(dict) ==>|
//!     |<------- DICT_SIZE -----------|                              |
//!     |-------- FILE_NAME(path) ---->|                              |
//!     |-------- FILE_NAME(path) ----------------------------------->|
//!     |<------- VECTOR --------------|                              |
//!     |-------- FILE_NAME(path) ---->|                              |
//!     |<------------------------------------- VECTOR ---------------|
//!     |-------- FILE_NAME("") ------------------------------------->|
//!     |<------- VECTOR --------------|                              |
//!     |-------- FILE_NAME("") ------>|                              |
//! ```
//!
//! # Message Framing
//!
//! Each frame carries a 1-byte tag and a 4-byte payload length (little-endian
//! u32) ahead of the payload:
//!
//! ```text
//! [1 byte: tag][4 bytes: payload length][N bytes: payload]
//! ```
//!
//! The header lets a receiver probe a pending frame for its kind and payload
//! length before it allocates anything. FILE_NAME payloads are raw UTF-8, so a
//! terminating FILE_NAME has a payload length of exactly zero. DICT_SIZE and
//! VECTOR payloads are MessagePack (rmp-serde).

use crate::distributed::group::{Communicator, Rank, Source, TagMatch};
use crate::profile::ProfileVector;
use thiserror::Error;

/// Frame header length in bytes
pub const HEADER_LEN: usize = 5;

/// Largest payload accepted on receive (256MB)
pub const MAX_PAYLOAD_LEN: usize = 256 * 1024 * 1024;

/// Message kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    /// Dictionary size (designated loader → coordinator, once)
    DictSize = 0,
    /// Next document path; empty payload terminates the worker (coordinator → worker)
    FileName = 1,
    /// Completed profile (worker → coordinator)
    Vector = 2,
    /// Initial readiness signal (worker → coordinator, once)
    Empty = 3,
}

impl Tag {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Tag {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Tag::DictSize),
            1 => Ok(Tag::FileName),
            2 => Ok(Tag::Vector),
            3 => Ok(Tag::Empty),
            other => Err(ProtocolError::UnknownTag(other)),
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Tag::DictSize => "DICT_SIZE",
            Tag::FileName => "FILE_NAME",
            Tag::Vector => "VECTOR",
            Tag::Empty => "EMPTY",
        };
        f.write_str(name)
    }
}

/// Protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Dictionary size
    ///
    /// Sent exactly once, by the designated loader, before any VECTOR.
    DictSize(usize),

    /// Document path to profile
    ///
    /// An empty path is the termination sentinel.
    FileName(String),

    /// Profile for the document most recently assigned to the sender
    Vector(ProfileVector),

    /// "Ready for work", sent once per worker at startup
    Empty,
}

impl Message {
    /// Termination sentinel (zero-length FILE_NAME)
    pub fn terminate() -> Self {
        Message::FileName(String::new())
    }

    pub fn is_terminate(&self) -> bool {
        matches!(self, Message::FileName(name) if name.is_empty())
    }

    pub fn tag(&self) -> Tag {
        match self {
            Message::DictSize(_) => Tag::DictSize,
            Message::FileName(_) => Tag::FileName,
            Message::Vector(_) => Tag::Vector,
            Message::Empty => Tag::Empty,
        }
    }

    /// Encode the payload (without header)
    pub fn encode_payload(&self) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Message::DictSize(size) => {
                rmp_serde::to_vec(&(*size as u64)).map_err(|e| ProtocolError::Encode(e.to_string()))
            }
            Message::FileName(name) => Ok(name.as_bytes().to_vec()),
            Message::Vector(counters) => {
                rmp_serde::to_vec(counters).map_err(|e| ProtocolError::Encode(e.to_string()))
            }
            Message::Empty => Ok(Vec::new()),
        }
    }

    /// Encode a complete frame
    #[cfg(test)]
    pub(crate) fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let payload = self.encode_payload()?;
        encode_frame(self.tag().as_u8(), &payload)
    }

    /// Decode a payload received under `tag`
    ///
    /// VECTOR length is not checked here; see [`expect_vector_len`].
    pub fn decode(tag: Tag, payload: &[u8]) -> Result<Self, ProtocolError> {
        match tag {
            Tag::DictSize => {
                let size: u64 = rmp_serde::from_slice(payload)
                    .map_err(|e| ProtocolError::Malformed { tag, reason: e.to_string() })?;
                let size = usize::try_from(size).map_err(|_| ProtocolError::Malformed {
                    tag,
                    reason: format!("dictionary size {} does not fit in usize", size),
                })?;
                Ok(Message::DictSize(size))
            }
            Tag::FileName => {
                let name = std::str::from_utf8(payload)
                    .map_err(|e| ProtocolError::Malformed { tag, reason: e.to_string() })?;
                Ok(Message::FileName(name.to_string()))
            }
            Tag::Vector => {
                let counters: ProfileVector = rmp_serde::from_slice(payload)
                    .map_err(|e| ProtocolError::Malformed { tag, reason: e.to_string() })?;
                Ok(Message::Vector(counters))
            }
            Tag::Empty => {
                if !payload.is_empty() {
                    return Err(ProtocolError::Malformed {
                        tag,
                        reason: format!("expected empty payload, got {} bytes", payload.len()),
                    });
                }
                Ok(Message::Empty)
            }
        }
    }
}

/// Check that a received profile has the agreed dictionary size
pub fn expect_vector_len(vector: &ProfileVector, dict_size: usize) -> Result<(), ProtocolError> {
    if vector.len() != dict_size {
        return Err(ProtocolError::VectorLength {
            expected: dict_size,
            actual: vector.len(),
        });
    }
    Ok(())
}

/// Parsed frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Raw tag byte (protocol tags or collective-internal tags)
    pub tag: u8,
    /// Payload length in bytes
    pub len: usize,
}

impl FrameHeader {
    /// Parse the header at the start of `buf`
    pub fn parse(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < HEADER_LEN {
            return Err(ProtocolError::Truncated {
                need: HEADER_LEN,
                got: buf.len(),
            });
        }
        let len = u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
        if len > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::TooLarge(len));
        }
        if buf.len() < HEADER_LEN + len {
            return Err(ProtocolError::Truncated {
                need: HEADER_LEN + len,
                got: buf.len(),
            });
        }
        Ok(Self { tag: buf[0], len })
    }
}

/// Prepend a header to `payload`
pub fn encode_frame(tag: u8, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::TooLarge(payload.len()));
    }
    let mut framed = Vec::with_capacity(HEADER_LEN + payload.len());
    framed.push(tag);
    framed.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    framed.extend_from_slice(payload);
    Ok(framed)
}

/// Payload slice of a complete frame
#[cfg(test)]
pub(crate) fn frame_payload(frame: &[u8]) -> Result<&[u8], ProtocolError> {
    let header = FrameHeader::parse(frame)?;
    Ok(&frame[HEADER_LEN..HEADER_LEN + header.len])
}

/// Send a protocol message to `dest`
pub fn send_message(comm: &Communicator, dest: Rank, msg: &Message) -> crate::Result<()> {
    let payload = msg.encode_payload()?;
    comm.send(dest, msg.tag().as_u8(), &payload)
}

/// Receive and decode the next protocol message matching the selectors
///
/// Returns the sender's rank with the message.
pub async fn recv_message(
    comm: &mut Communicator,
    source: Source,
    tag: Option<Tag>,
) -> crate::Result<(Rank, Message)> {
    let selector = match tag {
        Some(tag) => TagMatch::Tag(tag.as_u8()),
        None => TagMatch::Any,
    };
    let envelope = comm.recv(source, selector).await?;
    let tag = Tag::try_from(envelope.tag)?;
    let msg = Message::decode(tag, &envelope.payload)?;
    Ok((envelope.source, msg))
}

/// Protocol violations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unknown message tag {0}")]
    UnknownTag(u8),

    #[error("malformed {tag} payload: {reason}")]
    Malformed { tag: Tag, reason: String },

    #[error("failed to encode message: {0}")]
    Encode(String),

    #[error("frame truncated (need {need} bytes, got {got})")]
    Truncated { need: usize, got: usize },

    #[error("payload too large: {0} bytes")]
    TooLarge(usize),

    #[error("profile vector has {actual} counters, dictionary has {expected} words")]
    VectorLength { expected: usize, actual: usize },

    #[error("profile for document {0} received twice")]
    DuplicateResult(usize),

    #[error("no document with ordinal {0}")]
    UnknownOrdinal(usize),

    #[error("result matrix incomplete: {recorded} of {expected} profiles recorded")]
    Incomplete { recorded: usize, expected: usize },

    #[error("collective operation failed: {0}")]
    Collective(String),

    #[error("unexpected {tag} from rank {source_rank}: {reason}")]
    Unexpected {
        tag: Tag,
        source_rank: usize,
        reason: String,
    },
}
