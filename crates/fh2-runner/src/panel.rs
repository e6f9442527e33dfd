//! Terminal stand-in for the on-screen panel.
//!
//! Each stdin line is one operator action: a key press, a slider move, the
//! break-in toggle, or a pick from the CAT command catalog.

use std::io::{self, Write};
use std::str::FromStr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use fh2_bridge::{Bridge, BridgeEvent, DeviceState, PanelConfig, SendError, StateField};
use fh2_transport::available_ports;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

/// Text shown by `help`.
pub const HELP: &str = "\
commands:
  vol <0-255>            set AF gain
  mon <0-100>            set monitor level
  bk [on|off]            set or toggle break-in
  btn <label>            press a panel key (1-5, MEM, <, ^, >, P/B, v, DEC)
  raw <command>          send a raw CAT command
  cat                    list the CAT command catalog
  cat <template> [value] send a catalog command
  query                  ask the radio for volume, monitor level and break-in
  state                  show the cached radio state
  ports                  list serial ports
  help                   show this text
  quit                   save and exit";

/// One operator action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelCommand {
    Volume(u8),
    Monitor(u8),
    /// `None` toggles.
    BreakIn(Option<bool>),
    Button(String),
    Raw(String),
    CatalogList,
    Catalog {
        template: String,
        value: Option<u32>,
    },
    Query,
    State,
    Ports,
    Help,
    Quit,
}

/// A line that is not a panel command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PanelError {
    #[error("unknown command '{0}', type 'help'")]
    Unknown(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("invalid {what}: '{text}'")]
    BadValue { what: &'static str, text: String },
}

fn parse_value<T: FromStr>(what: &'static str, text: Option<&str>) -> Result<T, PanelError> {
    let text = text.ok_or(PanelError::MissingArgument(what))?;
    text.parse().map_err(|_| PanelError::BadValue {
        what,
        text: text.to_string(),
    })
}

impl FromStr for PanelCommand {
    type Err = PanelError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let arg = (!rest.is_empty()).then_some(rest);

        match word.to_ascii_lowercase().as_str() {
            "vol" | "volume" => Ok(PanelCommand::Volume(parse_value("volume", arg)?)),
            "mon" | "monitor" => Ok(PanelCommand::Monitor(parse_value("monitor level", arg)?)),
            "bk" | "break-in" => match arg.map(str::to_ascii_lowercase).as_deref() {
                None => Ok(PanelCommand::BreakIn(None)),
                Some("on" | "1") => Ok(PanelCommand::BreakIn(Some(true))),
                Some("off" | "0") => Ok(PanelCommand::BreakIn(Some(false))),
                Some(_) => Err(PanelError::BadValue {
                    what: "break-in",
                    text: rest.to_string(),
                }),
            },
            "btn" | "key" => arg
                .map(|label| PanelCommand::Button(label.to_string()))
                .ok_or(PanelError::MissingArgument("btn")),
            "raw" => arg
                .map(|command| PanelCommand::Raw(command.to_string()))
                .ok_or(PanelError::MissingArgument("raw")),
            "cat" => match arg {
                None => Ok(PanelCommand::CatalogList),
                Some(rest) => {
                    let mut parts = rest.split_whitespace();
                    let template = parts.next().unwrap_or_default().to_string();
                    let value = match parts.next() {
                        Some(text) => Some(parse_value("value", Some(text))?),
                        None => None,
                    };
                    Ok(PanelCommand::Catalog { template, value })
                }
            },
            "query" => Ok(PanelCommand::Query),
            "state" => Ok(PanelCommand::State),
            "ports" => Ok(PanelCommand::Ports),
            "help" | "?" => Ok(PanelCommand::Help),
            "quit" | "exit" | "q" => Ok(PanelCommand::Quit),
            _ => Err(PanelError::Unknown(word.to_string())),
        }
    }
}

/// Whether the input loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Format a state snapshot for display.
pub fn format_state(state: &DeviceState) -> String {
    format!(
        "volume {} ({}), monitor {} ({}), break-in {} ({})",
        state.volume.value,
        state.source_of(StateField::Volume).as_str(),
        state.monitor_level.value,
        state.source_of(StateField::MonitorLevel).as_str(),
        if state.break_in.value { "on" } else { "off" },
        state.source_of(StateField::BreakIn).as_str(),
    )
}

/// Print bridge events until the bridge goes away.
pub fn spawn_event_printer(events: Receiver<BridgeEvent>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("fh2-events".to_string())
        .spawn(move || {
            for event in events {
                println!("{}", event);
            }
        })
}

/// Operator actions routed to a bridge.
pub struct Panel {
    bridge: Arc<Bridge>,
    config: Arc<Mutex<PanelConfig>>,
}

impl Panel {
    /// Wire the panel to a bridge. State changes are copied into `config`
    /// so the document saved on exit holds the latest values.
    pub fn new(bridge: Arc<Bridge>, config: Arc<Mutex<PanelConfig>>) -> Self {
        let store = Arc::clone(&config);
        bridge.on_state_change(move |change| change.state.write_into(&mut store.lock()));
        Panel { bridge, config }
    }

    /// Press the panel key with the given label (case-insensitive).
    pub fn press_button(&self, label: &str) -> Option<Result<(), SendError>> {
        let command = self
            .config
            .lock()
            .buttons
            .iter()
            .find(|b| b.label.eq_ignore_ascii_case(label))
            .map(|b| b.command.clone())?;
        debug!(label, %command, "button pressed");
        Some(self.bridge.send_command(&command))
    }

    /// Flip the break-in flag.
    pub fn toggle_break_in(&self) -> Result<(), SendError> {
        let on = !self.bridge.state().break_in.value;
        self.bridge.set_break_in(on)
    }

    /// Carry out one action, writing any direct output to `out`.
    ///
    /// Traffic and failures are reported through bridge events; only
    /// output that has no event (listings, rejected values) goes to `out`.
    pub fn execute(&self, command: PanelCommand, out: &mut dyn Write) -> io::Result<Flow> {
        let result = match command {
            PanelCommand::Volume(volume) => self.bridge.set_volume(volume),
            PanelCommand::Monitor(level) => self.bridge.set_monitor_level(level),
            PanelCommand::BreakIn(Some(on)) => self.bridge.set_break_in(on),
            PanelCommand::BreakIn(None) => self.toggle_break_in(),
            PanelCommand::Button(label) => match self.press_button(&label) {
                Some(result) => result,
                None => {
                    writeln!(out, "no button labelled '{}'", label)?;
                    return Ok(Flow::Continue);
                }
            },
            PanelCommand::Raw(command) => self.bridge.send_command(&command),
            PanelCommand::CatalogList => {
                let config = self.config.lock();
                for group in config.cat_commands.groups() {
                    writeln!(out, "{}", group.name)?;
                    for command in &group.commands {
                        let marker = if command.takes_value() { "*" } else { " " };
                        writeln!(
                            out,
                            "  {:<10}{} {}",
                            command.template, marker, command.description
                        )?;
                    }
                }
                writeln!(out, "(* takes a value)")?;
                return Ok(Flow::Continue);
            }
            PanelCommand::Catalog { template, value } => {
                // The state callback also locks the config; release it before sending.
                let rendered = match self.config.lock().cat_commands.find(&template) {
                    Some(command) => command.render(value),
                    None => {
                        writeln!(out, "'{}' is not in the catalog", template)?;
                        return Ok(Flow::Continue);
                    }
                };
                rendered
                    .map_err(SendError::from)
                    .and_then(|command| self.bridge.send_command(&command))
            }
            PanelCommand::Query => self.bridge.query_initial_values(),
            PanelCommand::State => {
                writeln!(out, "{}", format_state(&self.bridge.state()))?;
                return Ok(Flow::Continue);
            }
            PanelCommand::Ports => {
                match available_ports() {
                    Ok(ports) if ports.is_empty() => writeln!(out, "no serial ports found")?,
                    Ok(ports) => {
                        for port in ports {
                            writeln!(
                                out,
                                "{}  {}{}",
                                port.name,
                                port.port_type,
                                port.product.map(|p| format!("  {}", p)).unwrap_or_default()
                            )?;
                        }
                    }
                    Err(e) => writeln!(out, "{}", e)?,
                }
                return Ok(Flow::Continue);
            }
            PanelCommand::Help => {
                writeln!(out, "{}", HELP)?;
                return Ok(Flow::Continue);
            }
            PanelCommand::Quit => return Ok(Flow::Quit),
        };

        match result {
            Ok(()) => {}
            Err(SendError::Invalid(e)) => writeln!(out, "{}", e)?,
            // Already reported as an event.
            Err(e) => debug!(error = %e, "action not sent"),
        }
        Ok(Flow::Continue)
    }
}
