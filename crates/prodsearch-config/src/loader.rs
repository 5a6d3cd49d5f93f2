//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.prodsearch/config.toml`
//! 2. Local config: `.prodsearch/config.toml` (or an explicit `--config` file)
//! 3. CLI overrides
//!
//! Later sources override earlier ones. Files are merged as TOML tables
//! before deserialization, so a key wins only when a later file actually
//! sets it. Arrays are replaced wholesale, never concatenated.

use crate::error::ConfigError;
use crate::{ConfigOverrides, SearchConfig};
use std::path::{Path, PathBuf};
use toml::{Table, Value};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global configuration directory name.
const GLOBAL_CONFIG_DIR: &str = ".prodsearch";

/// Local configuration directory name.
const LOCAL_CONFIG_DIR: &str = ".prodsearch";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.prodsearch`)
    global_config_dir: Option<PathBuf>,

    /// Cached raw global config table
    global_table: Option<Table>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.prodsearch`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(GLOBAL_CONFIG_DIR));

        Self {
            global_config_dir,
            global_table: None,
        }
    }

    /// Create a loader with a custom global config directory.
    ///
    /// Useful for testing.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_table: None,
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path under a root directory.
    pub fn local_config_path(&self, root: &Path) -> PathBuf {
        root.join(LOCAL_CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration for a root directory with optional CLI overrides.
    ///
    /// Merges config in order: defaults → global → local → overrides.
    pub fn load(
        &mut self,
        root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<SearchConfig, ConfigError> {
        let local_path = self.local_config_path(root);
        let local = if local_path.exists() {
            debug!("Loading local config from {:?}", local_path);
            Some(read_table(&local_path)?)
        } else {
            trace!("Local config not found at {:?}", local_path);
            None
        };

        self.load_layers(local, overrides)
    }

    /// Load configuration with an explicit file in place of the local config.
    ///
    /// Unlike the implicit local file, an explicit file must exist.
    pub fn load_from(
        &mut self,
        path: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<SearchConfig, ConfigError> {
        debug!("Loading config from {:?}", path);
        let table = read_table(path)?;
        self.load_layers(Some(table), overrides)
    }

    fn load_layers(
        &mut self,
        local: Option<Table>,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<SearchConfig, ConfigError> {
        let mut merged = Table::new();

        if let Some(global) = self.global_table()? {
            merge_tables(&mut merged, global);
        }

        if let Some(local) = local {
            merge_tables(&mut merged, local);
        }

        let mut config: SearchConfig = Value::Table(merged)
            .try_into()
            .map_err(ConfigError::Merge)?;

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        Ok(config)
    }

    /// Load only the global configuration (over defaults).
    pub fn load_global(&mut self) -> Result<Option<SearchConfig>, ConfigError> {
        match self.global_table()? {
            Some(table) => Value::Table(table)
                .try_into()
                .map(Some)
                .map_err(ConfigError::Merge),
            None => Ok(None),
        }
    }

    /// Load only the local configuration (over defaults).
    pub fn load_local(&self, root: &Path) -> Result<Option<SearchConfig>, ConfigError> {
        let local_path = self.local_config_path(root);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        load_config_file(&local_path).map(Some)
    }

    fn global_table(&mut self) -> Result<Option<Table>, ConfigError> {
        if let Some(ref table) = self.global_table {
            return Ok(Some(table.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let table = read_table(&global_path)?;
        self.global_table = Some(table.clone());

        Ok(Some(table))
    }

    /// Save configuration to the global config file.
    pub fn save_global(&self, config: &SearchConfig) -> Result<(), ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        save_config_file(&global_dir.join(CONFIG_FILE_NAME), config)
    }

    /// Save configuration to the local config file under a root directory.
    pub fn save_local(&self, root: &Path, config: &SearchConfig) -> Result<(), ConfigError> {
        save_config_file(&self.local_config_path(root), config)
    }

    /// Initialize global configuration directory.
    ///
    /// Creates `~/.prodsearch/config.toml` with default configuration.
    /// An existing file is left untouched.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        init_config_file(&global_dir.join(CONFIG_FILE_NAME))
    }

    /// Initialize local configuration under a root directory.
    ///
    /// Creates `.prodsearch/config.toml` with default configuration.
    pub fn init_local(&self, root: &Path) -> Result<PathBuf, ConfigError> {
        init_config_file(&self.local_config_path(root))
    }

    /// Clear cached global configuration.
    ///
    /// Forces reload on next load call.
    pub fn clear_cache(&mut self) {
        self.global_table = None;
    }
}

fn read_table(path: &Path) -> Result<Table, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    content
        .parse::<Table>()
        .map_err(|e| ConfigError::parse_toml(path, e))
}

/// Load a single configuration file from disk (over defaults).
fn load_config_file(path: &Path) -> Result<SearchConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))
}

/// Save a configuration file to disk.
fn save_config_file(path: &Path, config: &SearchConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}

fn init_config_file(path: &Path) -> Result<PathBuf, ConfigError> {
    if !path.exists() {
        save_config_file(path, &SearchConfig::default())?;
    }
    Ok(path.to_path_buf())
}

/// Recursively merge `overlay` into `base`. Nested tables merge key by key;
/// any other value in `overlay` replaces the one in `base`.
fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
