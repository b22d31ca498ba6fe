//! # Configuration
//!
//! Optional TOML file with defaults for the CLI. Command-line flags override
//! every value here.
//!
//! ```toml
//! database = "world.redb"
//! log_filter = "wirenet=debug"
//! log_format = "json"
//! default_wire = "gold"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use wirenet_core::{WireNetError, WireType};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "wirenet.toml";

pub const DEFAULT_DATABASE: &str = "wirenet.redb";

pub const DEFAULT_LOG_FILTER: &str = "wirenet=info";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WirenetConfig {
    pub database: Option<PathBuf>,
    pub log_filter: Option<String>,
    pub log_format: Option<LogFormat>,
    pub default_wire: Option<String>,
}

impl WirenetConfig {
    pub fn from_toml(text: &str) -> Result<Self, WireNetError> {
        let config: Self = toml::from_str(text).map_err(|e| WireNetError::Config(e.to_string()))?;
        if let Some(name) = &config.default_wire {
            WireType::from_name(name)
                .ok_or_else(|| WireNetError::Config(format!("Unknown default_wire: {}", name)))?;
        }
        Ok(config)
    }

    /// Load `path`, or `wirenet.toml` if it exists.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, WireNetError> {
        let path = match path {
            Some(path) => path,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = std::fs::read_to_string(path).map_err(|e| {
            WireNetError::Config(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Database path: flag, then config, then the default.
    pub fn database(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.database.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE))
    }

    /// Wire type: flag, then config, then copper.
    pub fn wire(&self, flag: Option<&str>) -> Result<WireType, WireNetError> {
        match flag.or(self.default_wire.as_deref()) {
            Some(name) => name.parse(),
            None => Ok(WireType::Copper),
        }
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Log format: the environment value wins when it names a known format.
    pub fn log_format(&self, env: Option<&str>) -> LogFormat {
        env.and_then(LogFormat::parse)
            .or(self.log_format)
            .unwrap_or_default()
    }
}
