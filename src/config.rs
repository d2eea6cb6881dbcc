use crate::utils::resolve_path;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// External packaging tool executable.
    pub package_tool: String,
    /// Command line client used for metadata queries.
    pub sqlcmd: String,
    /// Empty schema package published to purge a restore target.
    pub blank_dacpac: Option<String>,
    pub purge_target: bool,
    /// Artifact extension discovered by Restore-All.
    pub backup_extension: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            package_tool: "SqlPackage".into(),
            sqlcmd: "sqlcmd".into(),
            blank_dacpac: None,
            purge_target: true,
            backup_extension: "bacpac".into(),
        }
    }
}

impl AppConfig {
    pub fn get_blank_dacpac(&self) -> Option<PathBuf> {
        self.blank_dacpac
            .as_deref()
            .and_then(|p| resolve_path(p).ok())
            .filter(|p| p.is_file())
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("~"))
        .join(".sqlpkg")
        .join("config.toml")
}

/// Load `config_path` when it exists, then `SQLPKG_*` environment overrides.
pub fn get_app_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let (path, required) = match config_path {
        Some(p) => (
            resolve_path(p).map_err(ConfigError::Message)?,
            true,
        ),
        None => (default_config_path(), false),
    };

    let config_builder = Config::builder()
        .add_source(File::from(path).required(required))
        .add_source(Environment::with_prefix("SQLPKG"))
        .build()?;

    let config = config_builder.try_deserialize()?;
    Ok(config)
}
