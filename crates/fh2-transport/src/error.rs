//! Transport error types.

use std::io;
use thiserror::Error;

/// Errors opening the serial connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// No port name configured.
    #[error("no serial port configured")]
    EmptyPort,

    /// Baud rate must be positive.
    #[error("invalid baud rate: {0}")]
    InvalidBaudRate(u32),

    /// The port could not be opened (missing device, permission denied, busy).
    #[error("failed to open {port}: {source}")]
    Open {
        /// Port name that failed.
        port: String,
        /// Underlying driver error.
        #[source]
        source: serialport::Error,
    },

    /// Listing available ports failed.
    #[error("failed to enumerate ports: {0}")]
    Enumerate(#[source] serialport::Error),
}

/// Errors writing to the connection.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The connection is not open.
    #[error("serial port not open")]
    NotOpen,

    /// The underlying write failed.
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}

/// Errors reading from the connection.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The connection is not open.
    #[error("serial port not open")]
    NotOpen,

    /// Hardware or driver failure.
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}
