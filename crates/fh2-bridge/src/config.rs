//! Panel configuration document.
//!
//! The surrounding application loads and saves this as JSON; the bridge only
//! reads it at construction and writes state back into it on request. Keys
//! the panel core does not know about (window geometry and the like) are kept
//! in [`PanelConfig::extra`] so a load/save cycle does not lose them.

use std::fmt;
use std::time::Duration;

use fh2_cat_protocol::catalog::{self, CATALOG};
use fh2_cat_protocol::{CatResult, MONITOR_LEVEL_MAX};
use fh2_transport::{LinkConfig, DEFAULT_BAUD_RATE};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Configuration version written by this build.
pub const CONFIG_VERSION: &str = "v4.2";

/// A programmable panel key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonConfig {
    /// Text on the key.
    pub label: String,
    /// CAT command sent when pressed. Empty means unassigned.
    #[serde(default)]
    pub command: String,
}

impl ButtonConfig {
    fn new(label: &str, command: &str) -> Self {
        ButtonConfig {
            label: label.to_string(),
            command: command.to_string(),
        }
    }
}

/// The twelve FH-2 keys in keypad order.
pub fn default_buttons() -> Vec<ButtonConfig> {
    vec![
        ButtonConfig::new("1", "PB01;"),
        ButtonConfig::new("2", "PB02;"),
        ButtonConfig::new("3", "PB03;"),
        ButtonConfig::new("4", "PB04;"),
        ButtonConfig::new("5", "PB05;"),
        ButtonConfig::new("MEM", ""),
        ButtonConfig::new("<", "KC14;"),
        ButtonConfig::new("^", "KC13;"),
        ButtonConfig::new(">", "KC15;"),
        ButtonConfig::new("P/B", ""),
        ButtonConfig::new("v", "KC16;"),
        ButtonConfig::new("DEC", "FA000140;"),
    ]
}

/// A user-editable CAT command shown in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatCommand {
    /// Command template, optionally with one `%d`-style placeholder.
    pub template: String,
    /// Text shown next to the template.
    pub description: String,
}

impl CatCommand {
    /// Whether the template needs a value.
    pub fn takes_value(&self) -> bool {
        catalog::takes_value(&self.template)
    }

    /// Produce a concrete command from the template.
    pub fn render(&self, value: Option<u32>) -> CatResult<String> {
        catalog::render(&self.template, value)
    }
}

/// A named group of catalog commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatCommandGroup {
    /// Group name.
    pub name: String,
    /// Commands in file order.
    pub commands: Vec<CatCommand>,
}

/// The `cat_commands` document: group name to template to description.
///
/// Stored as nested JSON objects; group and command order is kept as
/// written in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatCommands(pub Vec<CatCommandGroup>);

impl CatCommands {
    /// Groups in display order.
    pub fn groups(&self) -> &[CatCommandGroup] {
        &self.0
    }

    /// Look up a command by its template in any group.
    pub fn find(&self, template: &str) -> Option<&CatCommand> {
        self.0
            .iter()
            .flat_map(|group| group.commands.iter())
            .find(|command| command.template == template)
    }
}

impl Default for CatCommands {
    fn default() -> Self {
        CatCommands(
            CATALOG
                .iter()
                .map(|group| CatCommandGroup {
                    name: group.name.to_string(),
                    commands: group
                        .entries
                        .iter()
                        .map(|entry| CatCommand {
                            template: entry.template.to_string(),
                            description: entry.description.to_string(),
                        })
                        .collect(),
                })
                .collect(),
        )
    }
}

struct GroupEntries<'a>(&'a [CatCommand]);

impl Serialize for GroupEntries<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for command in self.0 {
            map.serialize_entry(&command.template, &command.description)?;
        }
        map.end()
    }
}

impl Serialize for CatCommands {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for group in &self.0 {
            map.serialize_entry(&group.name, &GroupEntries(&group.commands))?;
        }
        map.end()
    }
}

/// Commands of one group, read in file order.
struct GroupCommands(Vec<CatCommand>);

impl<'de> Deserialize<'de> for GroupCommands {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CommandsVisitor;

        impl<'de> Visitor<'de> for CommandsVisitor {
            type Value = GroupCommands;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of command template to description")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut commands = Vec::new();
                while let Some((template, description)) = map.next_entry::<String, String>()? {
                    commands.push(CatCommand {
                        template,
                        description,
                    });
                }
                Ok(GroupCommands(commands))
            }
        }

        deserializer.deserialize_map(CommandsVisitor)
    }
}

impl<'de> Deserialize<'de> for CatCommands {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GroupsVisitor;

        impl<'de> Visitor<'de> for GroupsVisitor {
            type Value = CatCommands;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of group name to commands")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut groups = Vec::new();
                while let Some((name, commands)) = map.next_entry::<String, GroupCommands>()? {
                    groups.push(CatCommandGroup {
                        name,
                        commands: commands.0,
                    });
                }
                Ok(CatCommands(groups))
            }
        }

        deserializer.deserialize_map(GroupsVisitor)
    }
}

/// Read a stored level, clamping numbers into `0..=max`.
///
/// Anything that is not a number reads as zero, so one bad value never
/// discards the rest of the document.
fn clamp_level(value: &Value, max: u8) -> u8 {
    match value {
        Value::Number(n) => {
            let n = n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0);
            n.clamp(0, i64::from(max)) as u8
        }
        _ => 0,
    }
}

fn lenient_volume<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    Ok(clamp_level(&Value::deserialize(deserializer)?, u8::MAX))
}

fn lenient_monitor_level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    Ok(clamp_level(&Value::deserialize(deserializer)?, MONITOR_LEVEL_MAX))
}

/// Flat key/value configuration for the panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Version of the program that wrote the file.
    pub version: String,
    /// Serial device. Empty means no port configured.
    pub port: String,
    /// Serial baud rate.
    #[serde(rename = "baudrate")]
    pub baud_rate: u32,
    /// Last known AF gain.
    #[serde(deserialize_with = "lenient_volume")]
    pub volume: u8,
    /// Last known monitor level.
    #[serde(deserialize_with = "lenient_monitor_level")]
    pub monitor_level: u8,
    /// Last known break-in state.
    #[serde(rename = "bk_in_enabled")]
    pub break_in_enabled: bool,
    /// Panel key macros.
    pub buttons: Vec<ButtonConfig>,
    /// Command catalog offered by the panel.
    pub cat_commands: CatCommands,
    /// Read loop poll interval.
    pub poll_interval_ms: u64,
    /// Serial read timeout used when opening the port.
    pub read_timeout_ms: u64,
    /// Delay between startup and the initial state queries.
    pub startup_query_delay_ms: u64,
    /// Keys owned by other parts of the application.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        PanelConfig {
            version: CONFIG_VERSION.to_string(),
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            volume: 0,
            monitor_level: 0,
            break_in_enabled: false,
            buttons: default_buttons(),
            cat_commands: CatCommands::default(),
            poll_interval_ms: 100,
            read_timeout_ms: 500,
            startup_query_delay_ms: 1000,
            extra: serde_json::Map::new(),
        }
    }
}

impl PanelConfig {
    /// Serial connection parameters.
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig::new(self.port.clone(), self.baud_rate)
            .with_read_timeout(Duration::from_millis(self.read_timeout_ms))
    }

    /// Read loop poll interval, never zero.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Delay before the initial state queries.
    pub fn startup_query_delay(&self) -> Duration {
        Duration::from_millis(self.startup_query_delay_ms)
    }

    /// Whether a serial port is configured at all.
    pub fn has_port(&self) -> bool {
        !self.port.trim().is_empty()
    }
}
