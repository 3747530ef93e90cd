//! Configuration resolution and path discovery.
//!
//! Resolution order: CLI argument → environment variables → XDG paths → defaults.

use crate::config::DossierConfig;
use crate::validate::{validate_config, ConfigError};
use std::path::{Path, PathBuf};
use tracing::info;

/// Where the configuration file was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
const ENV_CONFIG_PATH: &str = "DOSSIER_CONFIG";
const ENV_CONFIG_DIR: &str = "DOSSIER_CONFIG_DIR";

/// Standard config file name.
const CONFIG_FILENAME: &str = "dossier.toml";

/// Application name for XDG directories.
const APP_NAME: &str = "dossier";

/// Resolve the configuration file path.
///
/// 1. Explicit CLI path. A CLI path that does not exist is an error, not a
///    silent fallthrough.
/// 2. `DOSSIER_CONFIG`
/// 3. `DOSSIER_CONFIG_DIR` + `dossier.toml`
/// 4. XDG config directory (`~/.config/dossier/dossier.toml`)
/// 5. Built-in defaults (None)
pub fn resolve_config_path(
    cli_path: Option<&Path>,
) -> Result<(Option<PathBuf>, ConfigSource), ConfigError> {
    if let Some(path) = cli_path {
        if !path.exists() {
            return Err(ConfigError::Io(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return Ok((Some(path.to_path_buf()), ConfigSource::CliArgument));
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok((Some(path), ConfigSource::Environment));
        }
    }

    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(CONFIG_FILENAME);
        if path.exists() {
            return Ok((Some(path), ConfigSource::Environment));
        }
    }

    if let Some(dir) = xdg_config_dir() {
        let path = dir.join(CONFIG_FILENAME);
        if path.exists() {
            return Ok((Some(path), ConfigSource::XdgConfig));
        }
    }

    Ok((None, ConfigSource::BuiltinDefault))
}

/// Resolve, load, apply environment overrides and validate.
pub fn load_config(cli_path: Option<&Path>) -> Result<(DossierConfig, ConfigSource), ConfigError> {
    let (path, source) = resolve_config_path(cli_path)?;

    let mut config = match &path {
        Some(p) => DossierConfig::from_file(p)?,
        None => DossierConfig::default(),
    };
    config.apply_env_overrides()?;
    validate_config(&config)?;

    info!(
        source = %source,
        path = path.as_ref().map(|p| p.display().to_string()).as_deref().unwrap_or("-"),
        "configuration loaded"
    );
    Ok((config, source))
}

/// Get the XDG config directory for dossier.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}
