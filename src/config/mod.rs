use crate::models::MediaSource;
use anyhow::{Context, anyhow};
use serde::Deserialize;
use std::path::{Path, PathBuf};

mod logs_config;

pub use logs_config::LogsConfig;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct CameraConfig {
    /// Camera selected at startup, the first camera when unset.
    pub default_index: Option<usize>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub logs: LogsConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    /// Devices reported by the device subsystem.
    #[serde(default)]
    pub devices: Vec<MediaSource>,
}

/// Reads the value of `-c`/`--config` from the command line arguments.
pub fn parse_config_path(args: impl IntoIterator<Item = String>) -> anyhow::Result<PathBuf> {
    let mut args = args.into_iter();
    args.next();
    while let Some(arg) = args.next() {
        if arg == "-c" || arg == "--config" {
            return match args.next() {
                Some(path) => Ok(PathBuf::from(path)),
                None => Err(anyhow!(
                    "Error: Please specify path string for -c argument."
                )),
            };
        }
    }
    Err(anyhow!(
        "Error: Please specify configuration file argument. Usage: -c <config_file>"
    ))
}

pub fn load(path: &Path) -> anyhow::Result<Config> {
    if !path.is_file() {
        return Err(anyhow!(
            "Error: Configuration file not found or invalid.\n\
        Please make sure that the configuration file exists and is a valid TOML file.\n\
        Expected file path: {:?}",
            path
        ));
    }
    let content = std::fs::read_to_string(path).with_context(|| {
        "Error: Failed to read configuration file.\n\
        Please check the file path and file permissions, and make sure the file is valid accessible"
    })?;
    toml::from_str(&content).with_context(|| {
        "Error: Failed to parse configuration file.\n\
        Please check the file syntax is valid TOML syntax"
    })
}
