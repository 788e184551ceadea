//! JSON configuration file adapter.
//!
//! Implements [`ConfigPort`] over a single JSON document.  A missing file
//! yields [`Bme68xConfig::default()`]; fields absent from the document
//! take their defaults too.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use log::{info, warn};

use crate::app::ports::ConfigPort;
use crate::config::Bme68xConfig;
use crate::error::ConfigError;

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse and validate a JSON document.
    pub fn parse(text: &str) -> Result<Bme68xConfig, ConfigError> {
        let cfg: Bme68xConfig = serde_json::from_str(text).map_err(|e| {
            warn!("Config: {e}");
            ConfigError::Parse
        })?;
        cfg.validate()?;
        Ok(cfg)
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<Bme68xConfig, ConfigError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => {
                let cfg = Self::parse(&text)?;
                info!("Config: loaded {}", self.path.display());
                Ok(cfg)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Config: {} not found, using defaults", self.path.display());
                Ok(Bme68xConfig::default())
            }
            Err(_) => Err(ConfigError::Unreadable),
        }
    }

    fn save(&self, config: &Bme68xConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let text = serde_json::to_string_pretty(config).map_err(|_| ConfigError::Parse)?;
        fs::write(&self.path, text).map_err(|_| ConfigError::PartialWrite)
    }
}
