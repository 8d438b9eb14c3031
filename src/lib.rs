//! docprofile - distributed document profiling
//!
//! docprofile counts, for every document in a directory, how often each word
//! of a dictionary occurs. Documents are spread over a pool of workers by a
//! single coordinator on demand, so faster workers take more documents.
//!
//! # Architecture
//!
//! - **Process group**: one coordinator and N workers, message passing only
//! - **Dictionary sync**: one worker loads the dictionary and broadcasts it
//! - **Self-scheduling**: each worker result doubles as a request for more work
//! - **Output**: text, CSV or JSON results plus a console summary

pub mod config;
pub mod corpus;
pub mod dictionary;
pub mod distributed;
pub mod error;
pub mod output;
pub mod profile;

// Re-export commonly used types
pub use config::Config;
pub use error::Error;

/// Result type used throughout docprofile
pub type Result<T> = std::result::Result<T, Error>;
