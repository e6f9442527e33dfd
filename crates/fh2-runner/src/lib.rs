//! # fh2-runner
//!
//! Terminal front end for the FH-2 panel emulator: configuration file
//! handling, the stdin-driven panel, and a simulated radio for dry runs.

pub mod loopback;
pub mod panel;
pub mod settings;

pub use loopback::{LoopbackRadio, RadioState};
pub use panel::{format_state, spawn_event_printer, Flow, Panel, PanelCommand, PanelError, HELP};
pub use settings::{load_config, parse_config, save_config, RunnerError, DEFAULT_CONFIG_FILE};
