//! CLI configuration file and environment resolution.
//!
//! Precedence, highest first: command-line flags, `TALLY_*` environment
//! variables, the JSON config file, built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tally_core::config::{
    RemoteConfig, SyncSettings, ENV_REMOTE_COLLECTION, ENV_REMOTE_TIMEOUT_SECS, ENV_REMOTE_TOKEN,
    ENV_REMOTE_URL,
};
use tally_core::util::normalize_text_option;

use crate::error::CliError;

const CONFIG_FILE_NAME: &str = "config.json";
const DB_FILE_NAME: &str = "tally.db";
pub const ENV_DB_PATH: &str = "TALLY_DB_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub remote_token: Option<String>,
    #[serde(default)]
    pub remote_collection: Option<String>,
    #[serde(default)]
    pub remote_timeout_secs: Option<u64>,
    #[serde(default)]
    pub sync_interval_secs: Option<u64>,
}

impl CliConfig {
    /// Load the config file; a missing file yields the defaults
    pub fn load_from_path(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| CliError::Config {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|error| CliError::Config {
            path: path.to_path_buf(),
            message: error.to_string(),
        })
    }

    /// Remote settings from `env` falling back to the file values
    pub fn remote_config(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<RemoteConfig>, CliError> {
        let lookup = |key: &str| {
            normalize_text_option(env(key)).or_else(|| match key {
                ENV_REMOTE_URL => self.remote_url.clone(),
                ENV_REMOTE_TOKEN => self.remote_token.clone(),
                ENV_REMOTE_COLLECTION => self.remote_collection.clone(),
                ENV_REMOTE_TIMEOUT_SECS => self.remote_timeout_secs.map(|secs| secs.to_string()),
                _ => None,
            })
        };
        Ok(RemoteConfig::from_lookup(lookup)?)
    }

    /// Worker cadence, with an explicit flag taking precedence
    pub fn sync_settings(&self, interval_flag: Option<u64>) -> SyncSettings {
        interval_flag
            .or(self.sync_interval_secs)
            .filter(|secs| *secs > 0)
            .map_or_else(SyncSettings::default, |secs| SyncSettings {
                interval: Duration::from_secs(secs),
            })
    }
}

pub fn default_config_path() -> PathBuf {
    app_dir(dirs::config_dir()).join(CONFIG_FILE_NAME)
}

pub fn resolve_config_path(cli_config: Option<PathBuf>) -> PathBuf {
    cli_config.unwrap_or_else(default_config_path)
}

pub fn resolve_db_path(
    cli_db_path: Option<PathBuf>,
    env_db_path: Option<PathBuf>,
    config: &CliConfig,
) -> PathBuf {
    cli_db_path
        .or(env_db_path)
        .or_else(|| config.db_path.clone())
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    app_dir(dirs::data_dir()).join(DB_FILE_NAME)
}

fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from(".")).join("tally")
}
