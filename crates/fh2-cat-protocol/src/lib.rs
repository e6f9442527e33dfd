//! FH-2 CAT Protocol
//!
//! This crate provides types and utilities for talking to a Yaesu transceiver
//! over its CAT (Computer Aided Transceiver) serial interface the way the FH-2
//! remote keypad does. The protocol is plain ASCII with no framing beyond
//! terminators and no checksum.
//!
//! # Protocol Overview
//!
//! - **Commands** (panel → radio): short ASCII strings terminated with `;`,
//!   e.g. `AG0128;` (set AF gain) or `BI?;` (query break-in).
//! - **Responses** (radio → panel): ASCII lines terminated with `;` and/or a
//!   newline, e.g. `AG?255;`, `ML1025`, `BI1`.
//! - There is no acknowledgment: every command is fire-and-forget, and the
//!   radio reports state asynchronously.
//!
//! # Response Classes
//!
//! - `AG?<n>` - AF gain (volume), 0-255
//! - `ML1<n>` - monitor level, 0-100
//! - `BI<d>` - break-in, `1` = on, anything else = off
//!
//! Everything else is passed through as unrecognized traffic.
//!
//! # Example
//!
//! ```rust
//! use fh2_cat_protocol::{Command, LineCodec, Response};
//!
//! // Build a command
//! let cmd = Command::SetVolume(7);
//! assert_eq!(cmd.to_command_string(), "AG0007;");
//!
//! // Frame and classify a response
//! let mut codec = LineCodec::new();
//! codec.push(b"AG?255;\r\n");
//! let line = codec.decode_line().unwrap();
//! assert_eq!(Response::classify(&line), Response::Volume(255));
//! ```

pub mod catalog;
mod codec;
mod commands;
mod error;
mod responses;

pub use codec::*;
pub use commands::*;
pub use error::*;
pub use responses::*;
