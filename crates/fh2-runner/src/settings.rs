//! Configuration file handling.
//!
//! The file is a flat JSON document. A missing or unreadable file is not an
//! error: the panel starts from defaults and writes a fresh file on exit.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use fh2_bridge::{PanelConfig, StartError, CONFIG_VERSION};
use fh2_transport::ConnectError;
use thiserror::Error;
use tracing::{debug, warn};

/// Default configuration file name, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "fh2_config.json";

/// Errors surfaced by the runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to list serial ports: {0}")]
    Ports(#[from] ConnectError),

    #[error("failed to start bridge: {0}")]
    Start(#[from] StartError),

    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] io::Error),

    #[error("failed to install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

/// Parse a configuration document.
pub fn parse_config(text: &str) -> Result<PanelConfig, RunnerError> {
    Ok(serde_json::from_str(text)?)
}

/// Load the configuration, falling back to defaults.
pub fn load_config(path: &Path) -> PanelConfig {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no configuration file, using defaults");
            return PanelConfig::default();
        }
        Err(source) => {
            let e = RunnerError::Read {
                path: path.to_path_buf(),
                source,
            };
            warn!("{}, using defaults", e);
            return PanelConfig::default();
        }
    };

    match parse_config(&text) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), "failed to load config, using defaults: {}", e);
            PanelConfig::default()
        }
    }
}

/// Write the configuration as pretty-printed JSON.
///
/// The version key is stamped with this build's version.
pub fn save_config(path: &Path, config: &PanelConfig) -> Result<(), RunnerError> {
    let mut config = config.clone();
    config.version = CONFIG_VERSION.to_string();
    let text = serde_json::to_string_pretty(&config)?;
    fs::write(path, text).map_err(|source| RunnerError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "configuration saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fh2-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = load_config(&scratch_file("does-not-exist"));
        assert_eq!(config, PanelConfig::default());
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let path = scratch_file("malformed");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(load_config(&path), PanelConfig::default());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_out_of_range_volume_keeps_settings() {
        let path = scratch_file("loud");
        fs::write(
            &path,
            r#"{"port": "COM3", "baudrate": 9600, "volume": 300, "monitor_level": 20}"#,
        )
        .unwrap();

        let config = load_config(&path);
        fs::remove_file(&path).unwrap();

        assert_eq!(config.port, "COM3");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.volume, 255);
        assert_eq!(config.monitor_level, 20);
    }

    #[test]
    fn test_save_then_load() {
        let path = scratch_file("save");
        let mut config = PanelConfig {
            port: "/dev/ttyUSB0".to_string(),
            volume: 128,
            version: "v1.0".to_string(),
            ..Default::default()
        };
        config
            .extra
            .insert("log_visible".to_string(), serde_json::Value::Bool(true));

        save_config(&path, &config).unwrap();
        let loaded = load_config(&path);
        fs::remove_file(&path).unwrap();

        assert_eq!(loaded.port, "/dev/ttyUSB0");
        assert_eq!(loaded.volume, 128);
        assert_eq!(loaded.version, CONFIG_VERSION);
        assert_eq!(loaded.extra["log_visible"], true);
    }

    #[test]
    fn test_parse_error_reported() {
        assert!(matches!(parse_config("[1, 2]"), Err(RunnerError::Json(_))));
    }
}
