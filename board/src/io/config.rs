//! Board config files: decode, validate, and write back in canonical form.
//!
//! The file format follows the extension (`.json`, `.toml`, anything else is
//! YAML). Every format decodes into the same untyped `serde_json::Value`
//! before [`validate`] turns it into a [`GridConfig`].

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::model::GridConfig;
use crate::core::validator::validate;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
    Toml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => DocumentFormat::Json,
            Some("toml") => DocumentFormat::Toml,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// Decode `text` into an untyped document. `path` is only used for messages.
pub fn parse_document(
    text: &str,
    format: DocumentFormat,
    path: &Path,
) -> Result<Value, ConfigError> {
    match format {
        DocumentFormat::Yaml => {
            serde_yml::from_str::<Value>(text).map_err(|e| ConfigError::parse(path, e))
        }
        DocumentFormat::Json => {
            serde_json::from_str::<Value>(text).map_err(|e| ConfigError::parse(path, e))
        }
        DocumentFormat::Toml => {
            toml::from_str::<Value>(text).map_err(|e| ConfigError::parse(path, e))
        }
    }
}

/// Read and decode a config file without validating it.
pub fn read_document(path: &Path) -> Result<Value, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::access(path, e))?;
    parse_document(&text, DocumentFormat::from_path(path), path)
}

/// Load and validate a board config.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_config(path: &Path) -> Result<GridConfig, ConfigError> {
    let document = read_document(path)?;
    let config = validate(&document)?;
    debug!(buttons = config.buttons.len(), "config loaded");
    Ok(config)
}

/// Render the canonical document for `config` in `format`.
pub fn render_config(config: &GridConfig, format: DocumentFormat) -> Result<String> {
    let mut buf = match format {
        DocumentFormat::Yaml => serde_yml::to_string(config).context("serialize config yaml")?,
        DocumentFormat::Json => {
            serde_json::to_string_pretty(config).context("serialize config json")?
        }
        DocumentFormat::Toml => toml::to_string_pretty(config).context("serialize config toml")?,
    };
    if !buf.ends_with('\n') {
        buf.push('\n');
    }
    Ok(buf)
}

/// Atomically write the canonical config to disk (temp file + rename).
pub fn write_config(path: &Path, config: &GridConfig) -> Result<()> {
    let buf = render_config(config, DocumentFormat::from_path(path))?;
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = temp_path(path);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
