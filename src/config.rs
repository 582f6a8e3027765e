use std::fs;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::LincsError;

pub const CONFIG_FILE: &str = "lincs.json";
pub const CONFIG_ENV: &str = "LINCS_CONFIG";
pub const DEVEL_ENV: &str = "LINCS_DEVEL";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub prod: Profile,
    #[serde(default)]
    pub devel: Option<Profile>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    #[serde(default)]
    pub version: Option<f64>,
    pub couchdb: StoreConfig,
}

/// Where the store lives and how to talk to it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub ip: String,
    pub bucket: String,
    /// Cluster manager port; `connect` checks the store is reachable here.
    pub port: u16,
    pub query_port: u16,
    pub view_port: u16,
    pub password: Option<String>,
    pub timeout_ms: u64,
    /// Largest key batch a single fetch may ask for; unlimited when unset.
    pub max_keys_per_get: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ip: "127.0.0.1".to_string(),
            bucket: "LINCS".to_string(),
            port: 8091,
            query_port: 8093,
            view_port: 8092,
            password: None,
            timeout_ms: 5000,
            max_keys_per_get: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub profile: String,
    pub version: f64,
    pub store: StoreConfig,
    pub source: Utf8PathBuf,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the config from `path`, or from the first of `$LINCS_CONFIG`,
    /// `./lincs.json` and the user config dir that exists. `LINCS_DEVEL`
    /// selects the devel profile.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, LincsError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Self::discover().ok_or(LincsError::MissingConfig)?,
        };

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| LincsError::ConfigRead(config_path.clone().into_std_path_buf()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| LincsError::ConfigParse(err.to_string()))?;

        let devel = std::env::var_os(DEVEL_ENV).is_some();
        Self::resolve_config(config, devel, config_path)
    }

    pub fn resolve_config(
        config: Config,
        devel: bool,
        source: Utf8PathBuf,
    ) -> Result<ResolvedConfig, LincsError> {
        let (name, profile) = if devel {
            let profile = config
                .devel
                .ok_or_else(|| LincsError::MissingProfile("devel".to_string()))?;
            ("devel", profile)
        } else {
            ("prod", config.prod)
        };

        Ok(ResolvedConfig {
            profile: name.to_string(),
            version: profile.version.unwrap_or(1.0),
            store: profile.couchdb,
            source,
        })
    }

    fn discover() -> Option<Utf8PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.trim().is_empty() {
                return Some(Utf8PathBuf::from(path.trim()));
            }
        }

        let local = Utf8PathBuf::from(CONFIG_FILE);
        if local.as_std_path().exists() {
            return Some(local);
        }

        BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.config_dir().join("lincs").join(CONFIG_FILE)).ok()
            })
            .filter(|path| path.as_std_path().exists())
    }
}
