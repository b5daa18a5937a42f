use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::app_dirs;

use super::errors::ConfigError;
use super::types::MisoConfig;

/// File name of the run configuration inside the application directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration file path, creating the application directory if needed.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(|error| match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    })?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Parse a configuration without validating it.
pub fn parse_str(text: &str, path: &Path) -> Result<MisoConfig, ConfigError> {
    toml::from_str(text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and parse the configuration at `path`, leaving validation to the caller.
///
/// Used when command-line overrides are applied before validating.
pub fn read_from_path(path: &Path) -> Result<MisoConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&text, path)
}

/// Read, parse and validate the configuration at `path`.
pub fn load_from_path(path: &Path) -> Result<MisoConfig, ConfigError> {
    let config = read_from_path(path)?;
    config.validate()?;
    debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Write `config` as TOML, replacing `path` atomically.
pub fn save_to_path(config: &MisoConfig, path: &Path) -> Result<(), ConfigError> {
    let data = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::CreateDir {
        path: dir.clone(),
        source,
    })?;
    let write_err = |source: std::io::Error| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = NamedTempFile::new_in(&dir).map_err(write_err)?;
    tmp.write_all(data.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}
