//! # fh2-bridge
//!
//! Keeps an FH-2 style control panel and a Yaesu transceiver in step.
//!
//! The [`Bridge`] turns panel intent (key presses, volume and monitor
//! changes, break-in toggles) into CAT commands, and turns the radio's
//! asynchronous reports back into a cached [`DeviceState`].
//!
//! ## Features
//!
//! - **Read loop**: one background thread per connection, lines handled in order
//! - **Optimistic updates**: local changes are applied before they are sent
//! - **Provenance**: every field records whether it came from the config,
//!   the radio, or a local action
//! - **Events**: log-style [`BridgeEvent`]s on crossbeam channels, plus
//!   state-change callbacks
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use fh2_bridge::{Bridge, PanelConfig};
//! use fh2_transport::MockTransport;
//!
//! let (transport, handle) = MockTransport::new("mock");
//! let bridge = Bridge::new(&PanelConfig::default(), Some(Arc::new(transport)));
//!
//! bridge.set_volume(7).unwrap();
//! assert_eq!(handle.written(), vec!["AG0007;"]);
//!
//! bridge.handle_line("AG?200;");
//! assert_eq!(bridge.state().volume.value, 200);
//! ```

mod bridge;
mod config;
mod error;
mod events;
mod state;

pub use bridge::{Bridge, BridgePhase};
pub use config::{
    default_buttons, ButtonConfig, CatCommand, CatCommandGroup, CatCommands, PanelConfig,
    CONFIG_VERSION,
};
pub use error::{SendError, StartError};
pub use events::{BridgeEvent, StateCallback};
pub use state::{DeviceState, Provenance, StateChange, StateField, Tracked};
