//! Session configuration
//!
//! Loaded from TOML, for example:
//!
//! ```toml
//! device_address = 1
//! dump_frames = true
//!
//! [serial]
//! baudrate = 115200
//! response_timeout_ms = 1000
//! ```
//!
//! Every key is optional; missing keys take the defaults below.

use jvs_hal::SerialConfig;
use jvs_protocol::{BROADCAST, MASTER_ADDRESS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Address given to the board by default
pub const DEFAULT_DEVICE_ADDRESS: u8 = 0x01;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Device address is reserved
    #[error("device address {0:#04x} is reserved")]
    ReservedAddress(u8),
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    /// Serial line settings and reply timeout
    pub serial: SerialConfig,
    /// Address assigned to the board during probing
    pub device_address: u8,
    /// Log every frame sent and received
    pub dump_frames: bool,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            device_address: DEFAULT_DEVICE_ADDRESS,
            dump_frames: false,
        }
    }
}

impl MasterConfig {
    /// Parse and validate a TOML configuration
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: MasterConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the device address is assignable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_address == MASTER_ADDRESS || self.device_address == BROADCAST {
            return Err(ConfigError::ReservedAddress(self.device_address));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jvs_hal::serial::{DataBits, Parity, StopBits};
    use std::time::Duration;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = MasterConfig::from_toml_str("").unwrap();
        assert_eq!(config, MasterConfig::default());
        assert_eq!(config.device_address, 1);
        assert_eq!(config.serial.baudrate, 115_200);
    }

    #[test]
    fn test_parse_full_config() {
        let config = MasterConfig::from_toml_str(
            r#"
            device_address = 2
            dump_frames = true

            [serial]
            baudrate = 57600
            parity = "even"
            response_timeout_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.device_address, 2);
        assert!(config.dump_frames);
        assert_eq!(config.serial.baudrate, 57_600);
        assert_eq!(config.serial.parity, Parity::Even);
        assert_eq!(
            config.serial.response_timeout(),
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_numeric_framing() {
        let config =
            MasterConfig::from_toml_str("[serial]\ndata_bits = 7\nstop_bits = 2\n").unwrap();
        assert_eq!(config.serial.data_bits, DataBits::Seven);
        assert_eq!(config.serial.stop_bits, StopBits::Two);

        assert!(matches!(
            MasterConfig::from_toml_str("[serial]\ndata_bits = 9\n"),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let config = MasterConfig::from_toml_str("[serial]\nresponse_timeout_ms = 0\n").unwrap();
        assert_eq!(config.serial.response_timeout(), None);
    }

    #[test]
    fn test_reserved_addresses_rejected() {
        assert!(matches!(
            MasterConfig::from_toml_str("device_address = 0"),
            Err(ConfigError::ReservedAddress(0x00))
        ));
        assert!(matches!(
            MasterConfig::from_toml_str("device_address = 255"),
            Err(ConfigError::ReservedAddress(0xFF))
        ));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            MasterConfig::from_toml_str("device_address = \"one\""),
            Err(ConfigError::TomlParse(_))
        ));
    }
}
