//! Default locations of the board config and engine settings.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

pub const APP_DIR_NAME: &str = "macroboard";
pub const CONFIG_FILE_NAME: &str = "config.yml";
pub const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Paths under one application config directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardPaths {
    pub config_path: PathBuf,
    pub settings_path: PathBuf,
}

impl BoardPaths {
    /// Layout under an explicit base config directory (e.g. `~/.config`).
    pub fn under(config_home: &Path) -> Self {
        let app_dir = config_home.join(APP_DIR_NAME);
        Self {
            config_path: app_dir.join(CONFIG_FILE_NAME),
            settings_path: app_dir.join(SETTINGS_FILE_NAME),
        }
    }

    /// Layout under the platform config directory: `$XDG_CONFIG_HOME` or
    /// `~/.config` on Linux, `%APPDATA%` on Windows.
    pub fn platform() -> Result<Self> {
        let config_home =
            dirs::config_dir().ok_or_else(|| anyhow!("cannot determine config directory"))?;
        Ok(Self::under(&config_home))
    }
}

/// Explicit path if given, otherwise the platform default config file.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(BoardPaths::platform()?.config_path),
    }
}

/// Explicit path if given, otherwise `settings.toml` beside the config file.
pub fn resolve_settings_path(explicit: Option<&Path>, config_path: &Path) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => config_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(SETTINGS_FILE_NAME),
    }
}
