//! Sensor configuration record
//!
//! Bus wiring plus the nested fusion-engine block.  The record is loaded
//! through [`ConfigPort`](crate::app::ports::ConfigPort); missing fields
//! fall back to the defaults below.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::bsec::SampleRate;
use crate::error::ConfigError;

/// Primary I2C address (SDO pulled high).
pub const I2C_ADDR_HIGH: u8 = 0x77;
/// Secondary I2C address (SDO to ground).
pub const I2C_ADDR_LOW: u8 = 0x76;

/// Top-level sensor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bme68xConfig {
    /// Whether the sensor is brought up at all
    pub enable: bool,
    /// I2C controller number
    pub i2c_bus: u8,
    /// 7-bit device address
    pub i2c_addr: u8,
    /// Fusion engine settings
    pub bsec: BsecConfig,
}

/// Fusion engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BsecConfig {
    pub enable: bool,
    /// Vendor configuration blob (with 4-byte header).  Empty = none.
    pub config_file: String,
    /// Persisted engine state.  Empty = no persistence.
    pub state_file: String,
    /// Seconds between state saves; negative disables saving.
    pub state_save_interval: i32,
    /// `"DIS"`, `"LP"`, `"ULP"` or empty.
    pub iaq_sample_rate: String,
    pub temp_sample_rate: String,
    pub rh_sample_rate: String,
    pub ps_sample_rate: String,
    /// Drop IAQ to LP while accuracy is below 3.
    pub iaq_auto_cal: bool,
}

impl Default for Bme68xConfig {
    fn default() -> Self {
        Self {
            enable: true,
            i2c_bus: 0,
            i2c_addr: I2C_ADDR_HIGH,
            bsec: BsecConfig::default(),
        }
    }
}

impl Default for BsecConfig {
    fn default() -> Self {
        Self {
            enable: true,
            config_file: String::new(),
            state_file: "bsec_state.bin".into(),
            state_save_interval: 3600, // 1/h
            iaq_sample_rate: "LP".into(),
            temp_sample_rate: String::new(),
            rh_sample_rate: String::new(),
            ps_sample_rate: String::new(),
            iaq_auto_cal: false,
        }
    }
}

impl BsecConfig {
    pub fn config_path(&self) -> Option<&str> {
        non_empty(&self.config_file)
    }

    pub fn state_path(&self) -> Option<&str> {
        non_empty(&self.state_file)
    }

    pub fn iaq_rate(&self) -> SampleRate {
        SampleRate::from_config(&self.iaq_sample_rate)
    }

    pub fn temp_rate(&self) -> SampleRate {
        SampleRate::from_config(&self.temp_sample_rate)
    }

    pub fn rh_rate(&self) -> SampleRate {
        SampleRate::from_config(&self.rh_sample_rate)
    }

    pub fn ps_rate(&self) -> SampleRate {
        SampleRate::from_config(&self.ps_sample_rate)
    }
}

impl Bme68xConfig {
    /// Reject values that cannot describe a real sensor.  Unknown rate
    /// strings are tolerated (they resolve to disabled) but logged.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.i2c_addr != I2C_ADDR_HIGH && self.i2c_addr != I2C_ADDR_LOW {
            return Err(ConfigError::Invalid("i2c_addr must be 0x76 or 0x77"));
        }
        let b = &self.bsec;
        for (group, rate) in [
            ("IAQ", &b.iaq_sample_rate),
            ("temp", &b.temp_sample_rate),
            ("RH", &b.rh_sample_rate),
            ("pressure", &b.ps_sample_rate),
        ] {
            if !SampleRate::is_known(rate) {
                warn!("Unknown {group} sample rate {rate:?}, treating as disabled");
            }
        }
        Ok(())
    }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}
