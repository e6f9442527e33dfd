//! Serial transport for the FH-2 panel.
//!
//! A [`Transport`] owns exactly one connection to the transceiver. It offers
//! byte-level writes and line-oriented reads with a bounded wait, and reports
//! failures as values instead of panicking. Writes and reads may happen from
//! different threads at the same time; implementations synchronize internally.
//!
//! - [`SerialTransport`] talks to a real port through the `serialport` crate.
//! - [`MockTransport`] keeps everything in memory for tests and dry runs.

use std::time::Duration;

mod error;
mod mock;
mod serial;

pub use error::*;
pub use mock::{MockHandle, MockTransport};
pub use serial::{available_ports, LinkConfig, PortInfo, SerialTransport, DEFAULT_BAUD_RATE};

/// A single open connection to the radio.
pub trait Transport: Send + Sync {
    /// Transmit bytes. No acknowledgment is awaited.
    fn write(&self, bytes: &[u8]) -> Result<(), WriteError>;

    /// Wait up to `timeout` for a complete line.
    ///
    /// Returns `Ok(None)` on timeout. Partial lines are kept until their
    /// terminator arrives.
    fn read_line(&self, timeout: Duration) -> Result<Option<String>, ReadError>;

    /// Release the connection. Idempotent and infallible.
    fn close(&self);

    /// Whether the connection is still open.
    fn is_open(&self) -> bool;

    /// Short description for logs, usually the port name.
    fn describe(&self) -> String;
}
