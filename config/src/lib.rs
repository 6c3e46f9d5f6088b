//! Configuration loading for census.
//!
//! The config file is TOML:
//!
//! ```toml
//! countries = ["France", "Germany", "Spain"]
//! manual_countries = ["France", "Germany"]
//!
//! [fetch]
//! endpoint = "https://countriesnow.space/api/v0.1/countries/population"
//! timeout_seconds = 20
//! missing_data = "sentinel"   # or "error"
//! ```
//!
//! Every key is optional. String values under `[fetch]` may reference
//! environment variables as `${NAME}`.

use std::path::{Path, PathBuf};
use std::{env, fs};

use census_fetcher::FetchConfig;
use census_types::Country;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "CENSUS_CONFIG";

/// Countries used by the fan-out, sequential, and stream modes when none are configured.
pub const DEFAULT_COUNTRIES: &[&str] = &[
    "France",
    "Russia",
    "Germany",
    "United Kingdom",
    "Portugal",
    "Spain",
    "Netherlands",
    "Sweden",
    "Greece",
    "Czechia",
    "Romania",
    "Israel",
];

/// Countries used by the manual mode when none are configured.
pub const DEFAULT_MANUAL_COUNTRIES: &[&str] = &["France", "Germany"];

#[derive(Debug, Default, Deserialize)]
pub struct CensusConfig {
    pub countries: Option<Vec<Country>>,
    pub manual_countries: Option<Vec<Country>>,
    pub fetch: Option<FetchConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found at {}", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl CensusConfig {
    /// Load from the default location.
    ///
    /// Honors `CENSUS_CONFIG` first, then `~/.census/config.toml`. A missing file at
    /// the home-directory location is `Ok(None)`; a missing file named by the
    /// environment variable is an error.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        if let Some(explicit) = env_config_path() {
            return Self::load_from(&explicit).map(Some);
        }

        let path = match config_path() {
            Some(path) => path,
            None => return Ok(None),
        };
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    /// Load from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match Self::from_toml_str(&content) {
            Ok(config) => {
                tracing::debug!("Loaded config from {:?}", path);
                Ok(config)
            }
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(content)?;
        if let Some(fetch) = config.fetch.as_mut() {
            fetch.endpoint = fetch.endpoint.as_deref().map(expand_env_vars);
            fetch.user_agent = fetch.user_agent.as_deref().map(expand_env_vars);
        }
        Ok(config)
    }

    /// Countries for the batch modes; the built-in list when unset or empty.
    #[must_use]
    pub fn countries(&self) -> Vec<Country> {
        non_empty_or_default(self.countries.as_deref(), DEFAULT_COUNTRIES)
    }

    /// Countries for the manual mode; France and Germany when unset or empty.
    #[must_use]
    pub fn manual_countries(&self) -> Vec<Country> {
        non_empty_or_default(self.manual_countries.as_deref(), DEFAULT_MANUAL_COUNTRIES)
    }

    #[must_use]
    pub fn fetch(&self) -> FetchConfig {
        self.fetch.clone().unwrap_or_default()
    }
}

fn non_empty_or_default(configured: Option<&[Country]>, defaults: &[&str]) -> Vec<Country> {
    match configured {
        Some(list) if !list.is_empty() => list.to_vec(),
        _ => defaults
            .iter()
            .filter_map(|name| Country::new(*name).ok())
            .collect(),
    }
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(end_rel) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + end_rel];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[start + 2 + end_rel + 1..];
    }

    out.push_str(rest);
    out
}

fn env_config_path() -> Option<PathBuf> {
    env::var_os(CONFIG_ENV_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".census").join("config.toml"))
}
