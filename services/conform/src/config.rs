//! Configuration types for the conformance harness

use serde::{Deserialize, Serialize};
use std::path::Path;

use conform_core::{FaultCodes, Settings};

/// Device class under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Telescope,
    Dome,
}

/// Connection parameters for the device under test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_alpaca_port")]
    pub port: u16,
    #[serde(default)]
    pub device_number: u32,
    pub device_type: DeviceType,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_alpaca_port(),
            device_number: 0,
            device_type: DeviceType::Telescope,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub settings: Settings,
    /// Driver-specific fault-code mapping; defaults cover the Alpaca
    /// reserved codes
    #[serde(default)]
    pub fault_codes: FaultCodes,
    /// Run against the built-in simulator instead of a network device
    #[serde(default)]
    pub loopback: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            settings: Settings::default(),
            fault_codes: FaultCodes::default(),
            loopback: false,
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_alpaca_port() -> u16 {
    11111
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"device": {"device_type": "telescope"}}"#).expect("parse");
        assert_eq!(config.device.host, "localhost");
        assert_eq!(config.device.port, 11111);
        assert_eq!(config.device.device_type, DeviceType::Telescope);
        assert!(!config.loopback);
    }

    #[test]
    fn full_config_round_trips() {
        let config: Config = serde_json::from_str(
            r#"{
                "device": {"host": "10.0.0.5", "port": 32323, "device_number": 1, "device_type": "dome"},
                "settings": {"slew_timeout": "2m", "destructive_tests": false},
                "fault_codes": {"not_implemented": [1024, 80]},
                "loopback": true
            }"#,
        )
        .expect("parse");
        assert_eq!(config.device.host, "10.0.0.5");
        assert_eq!(config.device.device_type, DeviceType::Dome);
        assert_eq!(
            config.settings.slew_timeout,
            std::time::Duration::from_secs(120)
        );
        assert!(!config.settings.destructive_tests);
        assert!(config.loopback);
    }

    #[test]
    fn load_config_reads_a_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"device": {{"device_type": "dome"}}}}"#).expect("write");

        let config = load_config(file.path()).expect("load");
        assert_eq!(config.device.device_type, DeviceType::Dome);
    }

    #[test]
    fn load_config_missing_file_is_an_io_error() {
        let err = load_config(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, crate::HarnessError::Io(_)));
    }
}
