//! Commands the panel sends to the transceiver.
//!
//! The firmware parses fixed-width fields, so the formatting here is exact:
//! - Volume: `AG0` + 3-digit zero-padded value + `;`
//! - Monitor level: `ML1` + unpadded decimal + `;`
//! - Break-in: `BI1;` / `BI0;`

use crate::codec::LineCodec;
use crate::error::{CatError, CatResult};

/// Highest accepted monitor level.
pub const MONITOR_LEVEL_MAX: u8 = 100;

/// Commands that can be sent to the transceiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // ========== AF Gain ==========
    /// Set AF gain (volume), 0-255.
    SetVolume(u8),

    /// Ask the radio to report AF gain.
    QueryVolume,

    // ========== Monitor ==========
    /// Set monitor level, 0-100. Build with [`Command::set_monitor_level`].
    SetMonitorLevel(u8),

    /// Ask the radio to report monitor level.
    QueryMonitorLevel,

    // ========== Break-In ==========
    /// Turn break-in on or off.
    SetBreakIn(bool),

    /// Ask the radio to report break-in status.
    QueryBreakIn,

    // ========== Raw Command ==========
    /// Send a raw command string as is.
    Raw(String),
}

impl Command {
    /// Build a monitor level command, rejecting levels above 100.
    pub fn set_monitor_level(level: u8) -> CatResult<Command> {
        if level > MONITOR_LEVEL_MAX {
            return Err(CatError::OutOfRange {
                field: "monitor level",
                value: i64::from(level),
                max: i64::from(MONITOR_LEVEL_MAX),
            });
        }
        Ok(Command::SetMonitorLevel(level))
    }

    /// The queries sent once after startup, in the order they go out.
    pub fn initial_queries() -> [Command; 3] {
        [
            Command::QueryVolume,
            Command::QueryMonitorLevel,
            Command::QueryBreakIn,
        ]
    }

    /// Encode the command as bytes to send to the radio.
    pub fn encode(&self) -> Vec<u8> {
        LineCodec::encode_command(&self.to_command_string())
    }

    /// Get the command string, including its `;` terminator.
    pub fn to_command_string(&self) -> String {
        match self {
            Command::SetVolume(volume) => format!("AG0{:03};", volume),
            Command::QueryVolume => "AG?;".to_string(),
            Command::SetMonitorLevel(level) => format!("ML1{};", level),
            Command::QueryMonitorLevel => "ML1;".to_string(),
            Command::SetBreakIn(true) => "BI1;".to_string(),
            Command::SetBreakIn(false) => "BI0;".to_string(),
            Command::QueryBreakIn => "BI?;".to_string(),
            Command::Raw(command) => command.clone(),
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_command_string())
    }
}
