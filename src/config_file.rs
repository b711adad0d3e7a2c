//! Configuration file support
//!
//! Loads composer, export and logging settings from TOML files.

use serde::{Deserialize, Serialize};
use std::path::Path;

use gifmedia_lib::{ComposerConfig, ExportConfig};

use crate::error::Result;

/// Configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Subtitled movie settings
    pub composer: ComposerConfig,
    /// Encoder settings
    pub export: ExportConfig,
    /// Logging settings
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "gifmedia=info,gifmedia_lib=info".to_string(),
            json: false,
        }
    }
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Split into the library configurations
    pub fn into_configs(self) -> (ComposerConfig, ExportConfig) {
        (self.composer, self.export)
    }
}
