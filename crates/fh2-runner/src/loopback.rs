//! Simulated radio for `--loopback` dry runs.
//!
//! Watches what the panel writes to a [`MockTransport`] and answers state
//! queries the way the transceiver does, so the whole panel can be exercised
//! without hardware.
//!
//! [`MockTransport`]: fh2_transport::MockTransport

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use fh2_bridge::PanelConfig;
use fh2_cat_protocol::MONITOR_LEVEL_MAX;
use fh2_transport::MockHandle;
use tracing::{debug, warn};

/// Settings held by the simulated radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RadioState {
    pub volume: u8,
    pub monitor_level: u8,
    pub break_in: bool,
}

impl RadioState {
    pub fn from_config(config: &PanelConfig) -> Self {
        RadioState {
            volume: config.volume,
            monitor_level: config.monitor_level.min(MONITOR_LEVEL_MAX),
            break_in: config.break_in_enabled,
        }
    }

    /// Apply one command and return the radio's answer, if it sends one.
    ///
    /// Set commands are answered with the new value, as with auto-information
    /// enabled on the transceiver.
    pub fn respond(&mut self, command: &str) -> Option<String> {
        let command = command.trim();
        let command = command.strip_suffix(';').unwrap_or(command);

        match command {
            "AG?" => return Some(self.volume_report()),
            "ML1" => return Some(self.monitor_report()),
            "BI?" => return Some(self.break_in_report()),
            "BI1" | "BI0" => {
                self.break_in = command == "BI1";
                return Some(self.break_in_report());
            }
            _ => {}
        }

        if let Some(value) = command.strip_prefix("AG0") {
            self.volume = value.parse().ok()?;
            return Some(self.volume_report());
        }
        if let Some(value) = command.strip_prefix("ML1") {
            let level: u8 = value.parse().ok()?;
            if level > MONITOR_LEVEL_MAX {
                return None;
            }
            self.monitor_level = level;
            return Some(self.monitor_report());
        }
        None
    }

    fn volume_report(&self) -> String {
        format!("AG?{:03};", self.volume)
    }

    fn monitor_report(&self) -> String {
        format!("ML1{:03}", self.monitor_level)
    }

    fn break_in_report(&self) -> String {
        format!("BI{}", u8::from(self.break_in))
    }
}

/// Background thread playing the radio's side of a mock link.
pub struct LoopbackRadio {
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl LoopbackRadio {
    /// Start answering commands written through `link`.
    pub fn spawn(link: MockHandle, initial: RadioState, poll: Duration) -> std::io::Result<Self> {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop_flag);

        let handle = thread::Builder::new()
            .name("fh2-loopback".to_string())
            .spawn(move || {
                let mut radio = initial;
                while !flag.load(Ordering::Acquire) {
                    for command in link.take_written() {
                        if let Some(reply) = radio.respond(&command) {
                            debug!(%command, %reply, "loopback reply");
                            link.push_line(&reply);
                        }
                    }
                    thread::sleep(poll);
                }
            })?;

        Ok(LoopbackRadio {
            stop_flag,
            handle: Some(handle),
        })
    }

    /// Stop the radio thread.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("loopback thread panicked");
            }
        }
    }
}

impl Drop for LoopbackRadio {
    fn drop(&mut self) {
        self.stop();
    }
}
