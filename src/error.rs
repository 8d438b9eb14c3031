//! Error types
//!
//! Every failure is either a clean rejection before the process group starts
//! (`Config`) or a whole-group abort (everything else).

use crate::distributed::protocol::ProtocolError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the profiling engine
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid arguments, too few processes, missing inputs
    #[error("configuration error: {0}")]
    Config(String),

    /// An allocation for the result matrix or a message buffer failed
    #[error("resource exhausted: could not reserve {what} ({bytes} bytes)")]
    ResourceExhausted { what: &'static str, bytes: usize },

    /// A document could not be opened or read
    #[error("failed to read document {}: {source}", path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dictionary file could not be read
    #[error("failed to read dictionary {}: {source}", path.display())]
    Dictionary {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document directory could not be traversed
    #[error("failed to enumerate {}: {source}", path.display())]
    Enumeration {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A peer sent something the protocol does not allow
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A peer's mailbox closed while it was still expected to communicate
    #[error("rank {0} disconnected")]
    Disconnected(usize),

    /// Writing results failed
    #[error("failed to write results to {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A rank task panicked or ended without a result
    #[error("rank terminated abnormally: {0}")]
    RankFailed(String),
}

impl Error {
    /// Short classification used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::ResourceExhausted { .. } => "resource",
            Error::Document { .. } | Error::Dictionary { .. } | Error::Enumeration { .. } => "io",
            Error::Protocol(_) => "protocol",
            Error::Disconnected(_) => "transport",
            Error::Output { .. } => "output",
            Error::RankFailed(_) => "rank",
        }
    }
}

/// Reserve `additional` elements or report exhaustion
pub(crate) fn try_reserve<T>(buf: &mut Vec<T>, additional: usize, what: &'static str) -> Result<(), Error> {
    buf.try_reserve_exact(additional).map_err(|_| Error::ResourceExhausted {
        what,
        bytes: additional.saturating_mul(std::mem::size_of::<T>()),
    })
}
