//! Bridge error types.

use std::io;

use fh2_cat_protocol::CatError;
use fh2_transport::WriteError;
use thiserror::Error;

/// Why a command did not go out.
#[derive(Debug, Error)]
pub enum SendError {
    /// Nothing to send (e.g. an unassigned panel key).
    #[error("no command assigned")]
    NoCommand,

    /// The transport refused the write, or there is no connection.
    #[error("send failed: {0}")]
    SendFailed(#[source] WriteError),

    /// The requested value cannot be expressed as a command.
    #[error(transparent)]
    Invalid(#[from] CatError),
}

/// Why the read loop could not start.
#[derive(Debug, Error)]
pub enum StartError {
    /// The bridge was already stopped.
    #[error("bridge is closed")]
    Closed,

    /// The reader thread could not be spawned.
    #[error("failed to spawn reader thread: {0}")]
    Spawn(#[from] io::Error),
}
