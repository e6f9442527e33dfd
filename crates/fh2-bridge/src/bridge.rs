//! The protocol bridge.
//!
//! A [`Bridge`] owns the transport and the cached [`DeviceState`]. A single
//! reader thread polls the transport, classifies each line in arrival order
//! and applies it; any thread may send commands at the same time. The two
//! directions share nothing but the state mutex.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use fh2_cat_protocol::{
    Command, LineCodec, Response, BREAK_IN_PREFIX, MONITOR_PREFIX, VOLUME_PREFIX,
};
use fh2_metrics::{metric_defs, metrics, LinkLabels};
use fh2_transport::{ConnectError, SerialTransport, Transport, WriteError};
use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, info, trace, warn};

use crate::config::PanelConfig;
use crate::error::{SendError, StartError};
use crate::events::{BridgeEvent, EventBus};
use crate::state::{DeviceState, Provenance, StateChange, StateField};

/// Lifecycle of a bridge. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgePhase {
    /// Accepting commands and, once started, reading.
    Running,
    /// Stopped, or the transport failed while reading.
    Closed,
}

/// State shared with the reader thread.
struct Shared {
    transport: Option<Arc<dyn Transport>>,
    state: Mutex<DeviceState>,
    /// Held from a state write until its change is published. Reentrant so
    /// a callback may itself update state.
    publish_order: ReentrantMutex<()>,
    phase: Mutex<BridgePhase>,
    stop_flag: AtomicBool,
    events: EventBus,
    poll_interval: Duration,
    link: LinkLabels,
    labels: Vec<(&'static str, String)>,
}

impl Shared {
    fn should_stop(&self) -> bool {
        self.stop_flag.load(Ordering::Acquire)
    }

    /// Poll until stopped or the transport fails. Never closes the transport.
    fn read_loop(&self, transport: &dyn Transport) {
        debug!(port = %transport.describe(), "read loop started");

        while !self.should_stop() {
            match transport.read_line(self.poll_interval) {
                Ok(Some(line)) => self.handle_line(&line),
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "serial read error, closing bridge");
                    metrics::counter!(metric_defs::READ_ERRORS.name, self.labels.as_slice()).increment(1);
                    self.events.emit(BridgeEvent::ReadFailed(e.to_string()));
                    self.enter_closed();
                    break;
                }
            }
        }

        debug!("read loop finished");
    }

    fn handle_line(&self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        let started = Instant::now();

        debug!(line, "received");
        metrics::counter!(metric_defs::LINES_RECEIVED.name, self.labels.as_slice()).increment(1);
        self.events.emit(BridgeEvent::Received(line.to_string()));

        match Response::classify(line) {
            Response::Ignored { line, reason } => {
                debug!(%line, %reason, "ignoring response");
                let field = ignored_field(&line);
                let labels = self.link.with(&[("field", field.to_string())]);
                metrics::counter!(metric_defs::LINES_IGNORED.name, labels.as_slice()).increment(1);
                self.events.emit(BridgeEvent::Ignored {
                    line,
                    reason: reason.to_string(),
                });
            }
            Response::Unrecognized(line) => {
                trace!(%line, "unhandled response");
                metrics::counter!(metric_defs::LINES_UNRECOGNIZED.name, self.labels.as_slice())
                    .increment(1);
                self.events.emit(BridgeEvent::Unrecognized(line));
            }
            response => {
                let _order = self.publish_order.lock();
                let change = {
                    let mut state = self.state.lock();
                    state.apply(&response).map(|field| StateChange {
                        field,
                        source: Provenance::Device,
                        state: *state,
                    })
                };
                if let Some(change) = change {
                    self.publish(change);
                }
            }
        }

        metrics::histogram!(metric_defs::LINE_HANDLING_TIME.name, self.labels.as_slice())
            .record(started.elapsed().as_secs_f64() * 1_000_000.0);
    }

    /// Apply a local write under the lock and announce it.
    fn update_local(&self, field: StateField, update: impl FnOnce(&mut DeviceState)) {
        let _order = self.publish_order.lock();
        let change = {
            let mut state = self.state.lock();
            update(&mut state);
            StateChange {
                field,
                source: Provenance::Local,
                state: *state,
            }
        };
        self.publish(change);
    }

    fn publish(&self, change: StateChange) {
        debug!(
            field = change.field.as_str(),
            source = change.source.as_str(),
            "state updated"
        );
        let labels = self.link.with(&[
            ("field", change.field.as_str().to_string()),
            ("source", change.source.as_str().to_string()),
        ]);
        metrics::counter!(metric_defs::STATE_UPDATES.name, labels.as_slice()).increment(1);
        match change.field {
            StateField::Volume => {
                metrics::gauge!(metric_defs::VOLUME.name, self.labels.as_slice())
                    .set(f64::from(change.state.volume.value));
            }
            StateField::MonitorLevel => {
                metrics::gauge!(metric_defs::MONITOR_LEVEL.name, self.labels.as_slice())
                    .set(f64::from(change.state.monitor_level.value));
            }
            StateField::BreakIn => {}
        }
        self.events.state_changed(change);
    }

    fn send_command(&self, command: &str) -> Result<(), SendError> {
        if command.is_empty() {
            info!("no command assigned");
            self.events.emit(BridgeEvent::NoCommand);
            return Err(SendError::NoCommand);
        }

        let result = match &self.transport {
            Some(transport) => transport.write(&LineCodec::encode_command(command)),
            None => Err(WriteError::NotOpen),
        };

        match result {
            Ok(()) => {
                debug!(command, "sent");
                metrics::counter!(metric_defs::COMMANDS_SENT.name, self.labels.as_slice()).increment(1);
                self.events.emit(BridgeEvent::Sent(command.to_string()));
                Ok(())
            }
            Err(e) => {
                warn!(command, error = %e, "error sending command");
                metrics::counter!(metric_defs::SEND_FAILURES.name, self.labels.as_slice()).increment(1);
                self.events.emit(BridgeEvent::SendFailed {
                    command: command.to_string(),
                    error: e.to_string(),
                });
                Err(SendError::SendFailed(e))
            }
        }
    }

    /// Move to `Closed`, announcing it the first time only.
    fn enter_closed(&self) {
        let mut phase = self.phase.lock();
        if *phase == BridgePhase::Closed {
            return;
        }
        *phase = BridgePhase::Closed;
        drop(phase);
        info!("bridge closed");
        self.events.emit(BridgeEvent::Closed);
    }

}

/// Which state field an ignored line was meant for.
fn ignored_field(line: &str) -> &'static str {
    let field = if line.starts_with(VOLUME_PREFIX) {
        StateField::Volume
    } else if line.starts_with(MONITOR_PREFIX) {
        StateField::MonitorLevel
    } else if line.starts_with(BREAK_IN_PREFIX) {
        StateField::BreakIn
    } else {
        return "unknown";
    };
    field.as_str()
}

/// Bidirectional bridge between panel intent and radio state.
pub struct Bridge {
    shared: Arc<Shared>,
    reader: Mutex<Option<JoinHandle<()>>>,
    transport_closed: AtomicBool,
    connect_error: Option<String>,
}

impl Bridge {
    /// Create a bridge over an already opened transport, or none at all.
    ///
    /// Without a transport the bridge still works; every send fails with
    /// [`SendError::SendFailed`].
    pub fn new(config: &PanelConfig, transport: Option<Arc<dyn Transport>>) -> Self {
        let link = LinkLabels::new(
            transport
                .as_ref()
                .map(|t| t.describe())
                .unwrap_or_else(|| "offline".to_string()),
        );

        Bridge {
            shared: Arc::new(Shared {
                transport,
                state: Mutex::new(DeviceState::from_config(config)),
                publish_order: ReentrantMutex::new(()),
                phase: Mutex::new(BridgePhase::Running),
                stop_flag: AtomicBool::new(false),
                events: EventBus::default(),
                poll_interval: config.poll_interval(),
                labels: link.to_labels(),
                link,
            }),
            reader: Mutex::new(None),
            transport_closed: AtomicBool::new(false),
            connect_error: None,
        }
    }

    /// Open the configured serial port and build a bridge over it.
    ///
    /// A port that cannot be opened is logged and leaves the bridge without
    /// a connection; see [`Bridge::connect_error`].
    pub fn connect(config: &PanelConfig) -> Self {
        if !config.has_port() {
            warn!("no serial port configured");
            return Bridge::offline(config, ConnectError::EmptyPort);
        }
        match SerialTransport::open(&config.link_config()) {
            Ok(transport) => {
                info!(port = %config.port, baud = config.baud_rate, "opened serial port");
                Bridge::new(config, Some(Arc::new(transport)))
            }
            Err(e) => {
                warn!(error = %e, "error opening serial port");
                Bridge::offline(config, e)
            }
        }
    }

    fn offline(config: &PanelConfig, error: ConnectError) -> Self {
        let mut bridge = Bridge::new(config, None);
        bridge.connect_error = Some(error.to_string());
        bridge
    }

    /// Why [`Bridge::connect`] ended up without a connection.
    pub fn connect_error(&self) -> Option<&str> {
        self.connect_error.as_deref()
    }

    /// Whether a live transport is attached.
    pub fn is_connected(&self) -> bool {
        self.shared
            .transport
            .as_ref()
            .is_some_and(|t| t.is_open())
    }

    /// Spawn the reader thread. Calling it again is a no-op.
    pub fn start(&self) -> Result<(), StartError> {
        if self.phase() == BridgePhase::Closed {
            return Err(StartError::Closed);
        }
        let mut reader = self.reader.lock();
        if reader.is_some() {
            return Ok(());
        }
        let Some(transport) = self.shared.transport.clone() else {
            warn!("serial port not open, read loop not started");
            return Ok(());
        };

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("fh2-reader".to_string())
            .spawn(move || shared.read_loop(transport.as_ref()))?;
        *reader = Some(handle);
        Ok(())
    }

    /// Stop reading and release the transport. Idempotent.
    ///
    /// The reader thread notices the flag within one poll interval; it is
    /// joined before the transport is closed so a read is never cut short.
    pub fn stop(&self) {
        self.shared.stop_flag.store(true, Ordering::Release);

        if let Some(handle) = self.reader.lock().take() {
            if handle.join().is_err() {
                warn!("reader thread panicked");
            }
        }

        if !self.transport_closed.swap(true, Ordering::AcqRel) {
            if let Some(transport) = &self.shared.transport {
                transport.close();
            }
        }
        self.shared.enter_closed();
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> BridgePhase {
        *self.shared.phase.lock()
    }

    /// Snapshot of the cached device state.
    pub fn state(&self) -> DeviceState {
        *self.shared.state.lock()
    }

    /// Register a callback for every state change.
    ///
    /// Callbacks run on the thread that made the change: the reader thread
    /// for device reports, the caller's thread for local updates. Changes are
    /// delivered in the order they were applied, so the last callback always
    /// carries the current state.
    pub fn on_state_change<F>(&self, callback: F)
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.shared.events.on_state_change(Arc::new(callback));
    }

    /// Receive every event from now on.
    pub fn subscribe(&self) -> Receiver<BridgeEvent> {
        self.shared.events.subscribe()
    }

    /// Send a raw command. Empty commands are not transmitted.
    pub fn send_command(&self, command: &str) -> Result<(), SendError> {
        self.shared.send_command(command)
    }

    /// Send a typed command.
    pub fn send(&self, command: &Command) -> Result<(), SendError> {
        self.send_command(&command.to_command_string())
    }

    /// Classify and apply one inbound line.
    pub fn handle_line(&self, line: &str) {
        self.shared.handle_line(line);
    }

    /// Set AF gain locally, then tell the radio.
    pub fn set_volume(&self, volume: u8) -> Result<(), SendError> {
        self.shared
            .update_local(StateField::Volume, |s| s.set_volume(volume, Provenance::Local));
        self.send(&Command::SetVolume(volume))
    }

    /// Set monitor level locally, then tell the radio. Levels above 100 are rejected.
    pub fn set_monitor_level(&self, level: u8) -> Result<(), SendError> {
        let command = Command::set_monitor_level(level)?;
        self.shared.update_local(StateField::MonitorLevel, |s| {
            s.set_monitor_level(level, Provenance::Local)
        });
        self.send(&command)
    }

    /// Set break-in locally, then tell the radio.
    pub fn set_break_in(&self, on: bool) -> Result<(), SendError> {
        self.shared
            .update_local(StateField::BreakIn, |s| s.set_break_in(on, Provenance::Local));
        self.send(&Command::SetBreakIn(on))
    }

    /// Ask for volume, monitor level and break-in, in that order.
    ///
    /// Each query goes out on its own; a failure does not hold back the rest.
    /// Returns the first failure, if any.
    pub fn query_initial_values(&self) -> Result<(), SendError> {
        let mut first_error = None;
        for query in Command::initial_queries() {
            if let Err(e) = self.send(&query) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.stop();
    }
}
