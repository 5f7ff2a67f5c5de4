//! Engine runtime settings stored next to the board config as `settings.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Engine settings (TOML).
///
/// Separate from the board document so a board can be shared between
/// machines with different shells. Missing fields take the platform defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Program and leading arguments used to run a state command
    /// (e.g. `["sh", "-c"]`); the command line is appended last.
    pub shell: Vec<String>,

    /// Kill a state command after this many seconds and treat it as failed.
    /// Unset means commands may run forever.
    pub command_timeout_secs: Option<u64>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        let shell = if cfg!(windows) {
            vec!["cmd".to_string(), "/C".to_string()]
        } else {
            vec!["sh".to_string(), "-c".to_string()]
        };
        Self {
            shell,
            command_timeout_secs: None,
        }
    }
}

impl RuntimeSettings {
    pub fn validate(&self) -> Result<()> {
        if self.shell.is_empty() || self.shell[0].trim().is_empty() {
            return Err(anyhow!("shell must be a non-empty array"));
        }
        if self.command_timeout_secs == Some(0) {
            return Err(anyhow!("command_timeout_secs must be > 0 when set"));
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}

/// Load settings from a TOML file.
///
/// If the file is missing, returns `RuntimeSettings::default()`.
pub fn load_settings(path: &Path) -> Result<RuntimeSettings> {
    if !path.exists() {
        let settings = RuntimeSettings::default();
        settings.validate()?;
        return Ok(settings);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let settings: RuntimeSettings =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    settings
        .validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(settings)
}
