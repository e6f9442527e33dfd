//! In-memory transport.
//!
//! [`MockTransport`] behaves like an open serial port whose far end is
//! driven through a cloneable [`MockHandle`]: tests push inbound bytes,
//! inject failures, and inspect what was written.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fh2_cat_protocol::LineCodec;
use parking_lot::{Condvar, Mutex};

use crate::error::{ReadError, WriteError};
use crate::Transport;

#[derive(Default)]
struct MockState {
    inbound: LineCodec,
    written: Vec<Vec<u8>>,
    write_calls: usize,
    close_calls: usize,
    closed: bool,
    fail_writes: bool,
    read_failure: Option<String>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<MockState>,
    data_ready: Condvar,
}

/// Far-end control for a [`MockTransport`].
#[derive(Clone, Default)]
pub struct MockHandle {
    shared: Arc<Shared>,
}

impl MockHandle {
    /// Deliver raw bytes as if the radio sent them.
    pub fn push_bytes(&self, data: &[u8]) {
        self.shared.state.lock().inbound.push(data);
        self.shared.data_ready.notify_all();
    }

    /// Deliver one newline-terminated line.
    pub fn push_line(&self, line: &str) {
        let mut data = line.as_bytes().to_vec();
        data.extend_from_slice(b"\r\n");
        self.push_bytes(&data);
    }

    /// Make the next read fail with a driver error.
    pub fn fail_next_read(&self, message: &str) {
        self.shared.state.lock().read_failure = Some(message.to_string());
        self.shared.data_ready.notify_all();
    }

    /// Make every following write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.state.lock().fail_writes = fail;
    }

    /// Successfully written payloads, decoded as text.
    pub fn written(&self) -> Vec<String> {
        self.shared
            .state
            .lock()
            .written
            .iter()
            .map(|bytes| String::from_utf8_lossy(bytes).to_string())
            .collect()
    }

    /// Remove and return everything written since the last call.
    pub fn take_written(&self) -> Vec<String> {
        std::mem::take(&mut self.shared.state.lock().written)
            .into_iter()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .collect()
    }

    /// Number of `write` calls, successful or not.
    pub fn write_calls(&self) -> usize {
        self.shared.state.lock().write_calls
    }

    /// Number of `close` calls.
    pub fn close_calls(&self) -> usize {
        self.shared.state.lock().close_calls
    }
}

/// A transport backed by memory instead of a device.
pub struct MockTransport {
    name: String,
    shared: Arc<Shared>,
}

impl MockTransport {
    /// Create a connected transport and the handle that drives it.
    pub fn new(name: impl Into<String>) -> (MockTransport, MockHandle) {
        let handle = MockHandle::default();
        let transport = MockTransport {
            name: name.into(),
            shared: Arc::clone(&handle.shared),
        };
        (transport, handle)
    }
}

impl Transport for MockTransport {
    fn write(&self, bytes: &[u8]) -> Result<(), WriteError> {
        let mut state = self.shared.state.lock();
        state.write_calls += 1;
        if state.closed {
            return Err(WriteError::NotOpen);
        }
        if state.fail_writes {
            return Err(WriteError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock write failure",
            )));
        }
        state.written.push(bytes.to_vec());
        Ok(())
    }

    fn read_line(&self, timeout: Duration) -> Result<Option<String>, ReadError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        loop {
            if let Some(message) = state.read_failure.take() {
                return Err(ReadError::Io(io::Error::new(io::ErrorKind::Other, message)));
            }
            if state.closed {
                return Err(ReadError::NotOpen);
            }
            if let Some(line) = state.inbound.decode_line() {
                return Ok(Some(line));
            }
            if self
                .shared
                .data_ready
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return Ok(state.inbound.decode_line());
            }
        }
    }

    fn close(&self) {
        let mut state = self.shared.state.lock();
        state.close_calls += 1;
        state.closed = true;
        drop(state);
        self.shared.data_ready.notify_all();
    }

    fn is_open(&self) -> bool {
        !self.shared.state.lock().closed
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}
