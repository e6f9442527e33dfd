//! Serial port transport using the `serialport` crate.

use std::io::{self, Read, Write};
use std::time::Duration;

use fh2_cat_protocol::LineCodec;
use parking_lot::Mutex;
use serialport::SerialPort;
use tracing::{debug, trace};

use crate::error::{ConnectError, ReadError, WriteError};
use crate::Transport;

/// Baud rate the FH-2 panel uses unless configured otherwise.
pub const DEFAULT_BAUD_RATE: u32 = 38400;

/// Connection parameters. The protocol does not negotiate rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Platform device identifier, e.g. `/dev/ttyUSB0` or `COM3`.
    pub port: String,
    /// Baud rate supported by the radio firmware.
    pub baud_rate: u32,
    /// Default wait for a read.
    pub read_timeout: Duration,
}

impl LinkConfig {
    /// Create a config with the default read timeout.
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        LinkConfig {
            port: port.into(),
            baud_rate,
            read_timeout: Duration::from_millis(500),
        }
    }

    /// Set the default read timeout.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Check the parameters before touching the driver.
    pub fn validate(&self) -> Result<(), ConnectError> {
        if self.port.trim().is_empty() {
            return Err(ConnectError::EmptyPort);
        }
        if self.baud_rate == 0 {
            return Err(ConnectError::InvalidBaudRate(self.baud_rate));
        }
        Ok(())
    }
}

/// Read half: the port clone plus the codec holding any partial line.
struct ReadSide {
    port: Option<Box<dyn SerialPort>>,
    codec: LineCodec,
    timeout: Duration,
}

/// A transport over a real serial port.
///
/// The port is cloned once so that reads and writes use separate handles
/// and a sender never waits behind a pending read.
pub struct SerialTransport {
    port_name: String,
    writer: Mutex<Option<Box<dyn SerialPort>>>,
    reader: Mutex<ReadSide>,
}

impl SerialTransport {
    /// Open the configured port.
    pub fn open(config: &LinkConfig) -> Result<Self, ConnectError> {
        config.validate()?;

        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.read_timeout)
            .open()
            .map_err(|source| ConnectError::Open {
                port: config.port.clone(),
                source,
            })?;
        let read_port = port.try_clone().map_err(|source| ConnectError::Open {
            port: config.port.clone(),
            source,
        })?;

        debug!(port = %config.port, baud = config.baud_rate, "serial port opened");

        Ok(SerialTransport {
            port_name: config.port.clone(),
            writer: Mutex::new(Some(port)),
            reader: Mutex::new(ReadSide {
                port: Some(read_port),
                codec: LineCodec::new(),
                timeout: config.read_timeout,
            }),
        })
    }
}

impl Transport for SerialTransport {
    fn write(&self, bytes: &[u8]) -> Result<(), WriteError> {
        let mut writer = self.writer.lock();
        let port = writer.as_mut().ok_or(WriteError::NotOpen)?;
        port.write_all(bytes)?;
        port.flush()?;
        trace!(port = %self.port_name, len = bytes.len(), "wrote bytes");
        Ok(())
    }

    fn read_line(&self, timeout: Duration) -> Result<Option<String>, ReadError> {
        let mut side = self.reader.lock();
        if let Some(line) = side.codec.decode_line() {
            return Ok(Some(line));
        }

        let ReadSide { port, codec, timeout: current } = &mut *side;
        let port = port.as_mut().ok_or(ReadError::NotOpen)?;
        if *current != timeout {
            port.set_timeout(timeout).map_err(io::Error::from)?;
            *current = timeout;
        }

        let mut buf = [0u8; 256];
        match port.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(n) => {
                codec.push(&buf[..n]);
                Ok(codec.decode_line())
            }
            Err(ref e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(ReadError::Io(e)),
        }
    }

    fn close(&self) {
        let writer = self.writer.lock().take();
        let reader = self.reader.lock().port.take();
        if writer.is_some() || reader.is_some() {
            debug!(port = %self.port_name, "serial port closed");
        }
    }

    fn is_open(&self) -> bool {
        self.writer.lock().is_some()
    }

    fn describe(&self) -> String {
        self.port_name.clone()
    }
}

/// Information about an available serial port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device identifier to put in the configuration.
    pub name: String,
    /// Connection kind, e.g. `USB (0403:6001)`.
    pub port_type: String,
    /// USB product string, when known.
    pub product: Option<String>,
}

/// Enumerate serial ports present on this machine.
pub fn available_ports() -> Result<Vec<PortInfo>, ConnectError> {
    let ports = serialport::available_ports().map_err(ConnectError::Enumerate)?;

    Ok(ports
        .into_iter()
        .map(|p| {
            let (port_type, product) = match p.port_type {
                serialport::SerialPortType::UsbPort(info) => (
                    format!("USB ({:04X}:{:04X})", info.vid, info.pid),
                    info.product,
                ),
                serialport::SerialPortType::PciPort => ("PCI".to_string(), None),
                serialport::SerialPortType::BluetoothPort => ("Bluetooth".to_string(), None),
                serialport::SerialPortType::Unknown => ("Native".to_string(), None),
            };
            PortInfo {
                name: p.port_name,
                port_type,
                product,
            }
        })
        .collect())
}
