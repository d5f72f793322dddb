//! Client configuration: an optional RON file overlaid with CLI flags.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use splitter_engine::{default_player, ApiSettings, EngineConfig, DEFAULT_API_BASE_URL};
use splitter_logging::splitter_info;
use thiserror::Error;

use crate::cli::Cli;

pub const DEFAULT_CONFIG_FILE: &str = "stem-splitter.ron";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub download_dir: PathBuf,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    /// Empty disables playback.
    pub player: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            download_dir: PathBuf::from("stems"),
            connect_timeout_secs: None,
            request_timeout_secs: None,
            player: default_player(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl ClientConfig {
    /// Loads `explicit`, or the default file when it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if explicit.is_none() && err.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config = Self::parse(&content).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        splitter_info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn parse(content: &str) -> Result<Self, String> {
        ron::from_str(content).map_err(|err| err.to_string())
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.api_url {
            self.api_base_url = url.clone();
        }
        if let Some(dir) = &cli.download_dir {
            self.download_dir = dir.clone();
        }
        if let Some(secs) = cli.request_timeout_secs {
            self.request_timeout_secs = Some(secs);
        }
        if let Some(argv) = cli.player_argv() {
            self.player = argv;
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            api: ApiSettings {
                base_url: self.api_base_url.clone(),
                connect_timeout: self.connect_timeout_secs.map(Duration::from_secs),
                request_timeout: self.request_timeout_secs.map(Duration::from_secs),
            },
            download_dir: self.download_dir.clone(),
            player: self.player.clone(),
        }
    }
}
