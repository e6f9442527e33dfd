//! Cached view of the radio's state.

use fh2_cat_protocol::{Response, MONITOR_LEVEL_MAX};

use crate::config::PanelConfig;

/// Who last wrote a state field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Still holds the value loaded from the configuration.
    Default,
    /// Reported by the radio.
    Device,
    /// Set optimistically by a local action before sending.
    Local,
}

impl Provenance {
    /// Label used in logs and metrics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Provenance::Default => "default",
            Provenance::Device => "device",
            Provenance::Local => "local",
        }
    }
}

/// A value plus the provenance of its last write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tracked<T> {
    /// Current value.
    pub value: T,
    /// Who set it.
    pub source: Provenance,
}

impl<T> Tracked<T> {
    fn initial(value: T) -> Self {
        Tracked {
            value,
            source: Provenance::Default,
        }
    }

    fn set(&mut self, value: T, source: Provenance) {
        self.value = value;
        self.source = source;
    }
}

/// A field of [`DeviceState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateField {
    /// AF gain.
    Volume,
    /// Monitor level.
    MonitorLevel,
    /// Break-in flag.
    BreakIn,
}

impl StateField {
    /// Label used in logs and metrics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            StateField::Volume => "volume",
            StateField::MonitorLevel => "monitor_level",
            StateField::BreakIn => "break_in",
        }
    }
}

/// Volume, monitor level and break-in as last known. Last write wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceState {
    /// AF gain, 0-255.
    pub volume: Tracked<u8>,
    /// Monitor level, 0-100.
    pub monitor_level: Tracked<u8>,
    /// Break-in enabled.
    pub break_in: Tracked<bool>,
}

impl Default for DeviceState {
    fn default() -> Self {
        DeviceState {
            volume: Tracked::initial(0),
            monitor_level: Tracked::initial(0),
            break_in: Tracked::initial(false),
        }
    }
}

impl DeviceState {
    /// Initial state from the configured values.
    pub fn from_config(config: &PanelConfig) -> Self {
        DeviceState {
            volume: Tracked::initial(config.volume),
            monitor_level: Tracked::initial(config.monitor_level.min(MONITOR_LEVEL_MAX)),
            break_in: Tracked::initial(config.break_in_enabled),
        }
    }

    /// Apply a classified response. Returns the field it touched, if any.
    pub fn apply(&mut self, response: &Response) -> Option<StateField> {
        match *response {
            Response::Volume(volume) => {
                self.set_volume(volume, Provenance::Device);
                Some(StateField::Volume)
            }
            Response::MonitorLevel(level) => {
                self.set_monitor_level(level, Provenance::Device);
                Some(StateField::MonitorLevel)
            }
            Response::BreakIn(on) => {
                self.set_break_in(on, Provenance::Device);
                Some(StateField::BreakIn)
            }
            Response::Ignored { .. } | Response::Unrecognized(_) => None,
        }
    }

    /// Set AF gain.
    pub fn set_volume(&mut self, volume: u8, source: Provenance) {
        self.volume.set(volume, source);
    }

    /// Set monitor level.
    pub fn set_monitor_level(&mut self, level: u8, source: Provenance) {
        debug_assert!(level <= MONITOR_LEVEL_MAX);
        self.monitor_level.set(level, source);
    }

    /// Set break-in.
    pub fn set_break_in(&mut self, on: bool, source: Provenance) {
        self.break_in.set(on, source);
    }

    /// Provenance of one field.
    pub fn source_of(&self, field: StateField) -> Provenance {
        match field {
            StateField::Volume => self.volume.source,
            StateField::MonitorLevel => self.monitor_level.source,
            StateField::BreakIn => self.break_in.source,
        }
    }

    /// Copy the values into the configuration for the owner to persist.
    pub fn write_into(&self, config: &mut PanelConfig) {
        config.volume = self.volume.value;
        config.monitor_level = self.monitor_level.value;
        config.break_in_enabled = self.break_in.value;
    }
}

/// Notification sent after a state field was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    /// The field that changed.
    pub field: StateField,
    /// Who changed it.
    pub source: Provenance,
    /// Snapshot taken right after the write.
    pub state: DeviceState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = PanelConfig {
            volume: 200,
            monitor_level: 40,
            break_in_enabled: true,
            ..Default::default()
        };
        let state = DeviceState::from_config(&config);
        assert_eq!(state.volume.value, 200);
        assert_eq!(state.monitor_level.value, 40);
        assert!(state.break_in.value);
        assert_eq!(state.volume.source, Provenance::Default);
    }

    #[test]
    fn test_from_config_caps_monitor_level() {
        let config = PanelConfig {
            monitor_level: 180,
            ..Default::default()
        };
        assert_eq!(DeviceState::from_config(&config).monitor_level.value, 100);
    }

    #[test]
    fn test_apply_device_reports() {
        let mut state = DeviceState::default();

        assert_eq!(state.apply(&Response::Volume(255)), Some(StateField::Volume));
        assert_eq!(state.volume, Tracked { value: 255, source: Provenance::Device });

        assert_eq!(state.apply(&Response::MonitorLevel(25)), Some(StateField::MonitorLevel));
        assert_eq!(state.monitor_level.value, 25);

        assert_eq!(state.apply(&Response::BreakIn(true)), Some(StateField::BreakIn));
        assert!(state.break_in.value);
    }

    #[test]
    fn test_apply_ignores_other_traffic() {
        let mut state = DeviceState::default();
        let before = state;

        assert_eq!(state.apply(&Response::Unrecognized("FA0014074;".into())), None);
        assert_eq!(state, before);
    }

    #[test]
    fn test_last_write_wins() {
        let mut state = DeviceState::default();
        state.set_volume(10, Provenance::Local);
        state.apply(&Response::Volume(12));
        assert_eq!(state.volume.value, 12);
        assert_eq!(state.source_of(StateField::Volume), Provenance::Device);

        state.set_volume(50, Provenance::Local);
        assert_eq!(state.source_of(StateField::Volume), Provenance::Local);
    }

    #[test]
    fn test_write_into_config() {
        let mut state = DeviceState::default();
        state.set_volume(99, Provenance::Device);
        state.set_monitor_level(30, Provenance::Local);
        state.set_break_in(true, Provenance::Device);

        let mut config = PanelConfig::default();
        state.write_into(&mut config);
        assert_eq!(config.volume, 99);
        assert_eq!(config.monitor_level, 30);
        assert!(config.break_in_enabled);
    }
}
