//! Bootstrap configuration file resolution and loading
//!
//! Config file lookup order:
//! 1. Command-line argument (highest priority)
//! 2. `SPROUT_CONFIG` environment variable
//! 3. User config dir (`~/.config/sprout/<module>.toml` on Linux)
//! 4. System config (`/etc/sprout/<module>.toml`, Unix only)
//!
//! A missing config file is never fatal: the service logs a warning and
//! starts from compiled defaults. A config file that exists but fails to
//! parse IS fatal, since silently ignoring an operator's edits is worse.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SPROUT_CONFIG";

/// Resolves which TOML file a module should read at startup
#[derive(Debug, Clone)]
pub struct ConfigFileResolver {
    module_name: String,
}

impl ConfigFileResolver {
    /// Create resolver for a module (file stem, e.g. "sprout-dx")
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
        }
    }

    /// Resolve config file path
    ///
    /// CLI and ENV paths are returned even when the file does not exist, so
    /// the loader can warn about the exact path the operator asked for.
    /// Platform paths are only returned if the file exists.
    pub fn resolve(&self, cli_arg: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = cli_arg {
            return Some(path.to_path_buf());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        if let Some(path) = self.user_config_path() {
            if path.exists() {
                return Some(path);
            }
        }

        self.system_config_path().filter(|path| path.exists())
    }

    /// `~/.config/sprout/<module>.toml` (platform config dir)
    pub fn user_config_path(&self) -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("sprout").join(self.file_name()))
    }

    /// `/etc/sprout/<module>.toml`
    pub fn system_config_path(&self) -> Option<PathBuf> {
        if cfg!(unix) {
            Some(PathBuf::from("/etc/sprout").join(self.file_name()))
        } else {
            None
        }
    }

    fn file_name(&self) -> String {
        format!("{}.toml", self.module_name)
    }
}

/// Load a TOML config, falling back to `T::default()` when no file is available
pub fn load_toml_config<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        warn!("No config file found, using compiled defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        warn!(
            "Config file {} does not exist, using compiled defaults",
            path.display()
        );
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Write a config to disk atomically (temp file + rename)
pub fn write_toml_config<T: Serialize>(config: &T, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize config failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;

    info!("Wrote config to {}", path.display());
    Ok(())
}
