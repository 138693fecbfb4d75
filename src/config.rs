// src/config.rs
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// `X-API-Key: <key>`
    #[default]
    ApiKey,
    /// `Authorization: Bearer <token>`
    Jwt,
}

impl std::str::FromStr for AuthMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api_key" | "api-key" | "apikey" => Ok(AuthMethod::ApiKey),
            "jwt" | "bearer" => Ok(AuthMethod::Jwt),
            other => Err(ConfigError::UnknownAuth(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub api_key: String,
    pub auth: AuthMethod,
    pub download_dir: PathBuf,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            api_key: String::new(),
            auth: AuthMethod::ApiKey,
            download_dir: PathBuf::from("."),
            timeout_secs: 30,
        }
    }
}

/// Values given on the command line; `None` leaves the loaded value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub api_base_url: Option<String>,
    pub api_key: Option<String>,
    pub auth: Option<AuthMethod>,
    pub download_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Defaults, then the YAML file (if any), then `FLEETCSV_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Applies overrides from a variable lookup; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("FLEETCSV_API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = get("FLEETCSV_API_KEY") {
            self.api_key = v;
        }
        if let Some(v) = get("FLEETCSV_AUTH") {
            self.auth = v.parse()?;
        }
        if let Some(v) = get("FLEETCSV_DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(v);
        }
        Ok(())
    }

    /// Last layer of precedence, applied after [`Config::load`].
    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(v) = overrides.api_base_url {
            self.api_base_url = v;
        }
        if let Some(v) = overrides.api_key {
            self.api_key = v;
        }
        if let Some(v) = overrides.auth {
            self.auth = v;
        }
        if let Some(v) = overrides.download_dir {
            self.download_dir = v;
        }
        if let Some(v) = overrides.timeout_secs {
            self.timeout_secs = v;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}
