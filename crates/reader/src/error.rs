use ops::{ErrorKind, FatalError};
use std::io;

/// Error type surfaced by every reader in this crate. Record-level failures
/// flow through the shared substrate and only reach the caller as
/// `ReadError::Fatal` when `ErrorAction::Throw` is in effect; `Skip` and
/// `Stop` are absorbed inside the reader loop.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Fatal(#[from] FatalError),

    #[error("invalid reader configuration: {0}")]
    Config(String),
}

impl ReadError {
    /// The behavioral category, when one applies.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ReadError::Io(_) => Some(ErrorKind::Io),
            ReadError::Fatal(fatal) => Some(fatal.kind),
            ReadError::Config(_) => None,
        }
    }
}
