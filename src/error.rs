//! Errors raised anywhere in a run.
//!
//! Every variant is fatal. Library code returns them to a single top-level
//! handler per process, which prints a diagnostic and exits non-zero.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = HistError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum HistError {
    /// Inputs or group shape make the run meaningless (length mismatch,
    /// more participants than elements, zero bins, ...).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The file holds fewer elements than the slice being read requires.
    #[error(
        "short read from {}: slice needs elements [{offset}, {end}) but only {available} are present",
        path.display()
    )]
    ShortRead {
        path: PathBuf,
        offset: usize,
        end: usize,
        available: usize,
    },

    #[error("could not allocate room for {elements} elements")]
    Allocation { elements: usize },

    /// A send or receive failed, timed out, or violated the protocol.
    #[error("transport error: {0}")]
    Transport(String),

    /// A participant gave up locally and told the coordinator.
    #[error("rank {rank} aborted the run: {reason}")]
    ParticipantFailed { rank: usize, reason: String },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: token {token:?} at element {index} is not a number", path.display())]
    Parse {
        path: PathBuf,
        index: usize,
        token: String,
    },
}

impl HistError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<tonic::Status> for HistError {
    fn from(status: tonic::Status) -> Self {
        Self::Transport(format!("{}: {}", status.code(), status.message()))
    }
}

impl From<tonic::transport::Error> for HistError {
    fn from(err: tonic::transport::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
