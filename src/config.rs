//! Configuration for the watcher binary and library defaults.
//!
//! Layered configuration:
//! - Default values
//! - TOML configuration file (`.treewatch/settings.toml`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `TW_` and use double underscores
//! to separate nested levels:
//! - `TW_WATCH__BUFFER_SIZE=256` sets `watch.buffer_size`
//! - `TW_WATCH__SEND_CREATE=true` sets `watch.send_create`
//! - `TW_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Directory holding the settings file.
pub const CONFIG_DIR: &str = ".treewatch";
/// Settings file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Logging levels
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Watcher behaviour
    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Level applied to every module without an override
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `"treewatch::watcher" = "debug"`
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatchConfig {
    /// Capacity of the public event and error channels; 0 means unbuffered
    #[serde(default)]
    pub buffer_size: usize,

    /// Report entries that already exist when a recursive watch starts
    #[serde(default = "default_false")]
    pub send_create: bool,
}

fn default_version() -> u32 {
    1
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_false() -> bool {
    false
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            logging: LoggingConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: BTreeMap::new(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            buffer_size: 0,
            send_create: default_false(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
    ///
    /// The settings file is looked up in the nearest `.treewatch` directory
    /// from the current directory upwards.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honouring `TW_`
    /// environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels, single underscore
            // stays part of the field name
            .merge(Env::prefixed("TW_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find the settings file by looking for a `.treewatch` directory from
    /// the current directory up to the filesystem root.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join(CONFIG_FILE))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory.
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}
