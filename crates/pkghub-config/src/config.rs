use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

use crate::{
    error::{ConfigError, Result},
    utils::{parse_duration, xdg_config_home},
};

/// Release asset holding the registry-wide package index.
pub const DEFAULT_INDEX_URL: &str =
    "https://github.com/espanso/hub/releases/download/v1.0.0/package_index.json";

pub const DEFAULT_INDEX_TIMEOUT: &str = "30s";
pub const DEFAULT_ARCHIVE_TIMEOUT: &str = "60s";
pub const DEFAULT_SEARCH_THRESHOLD: f64 = 0.4;

pub const DEFAULT_FEATURED: [&str; 9] = [
    "all-emojis",
    "html-utils-package",
    "lorem",
    "spanish-accent",
    "greek-letters-improved",
    "math-symbols",
    "medical-docs",
    "shruggie",
    "espanso-dice",
];

/// Application's configuration
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Location of the package index document.
    /// Default: the v1.0.0 hub release asset. Env: PACKAGE_INDEX_URL
    pub index_url: Option<String>,

    /// Upper bound for the index download.
    /// Default: 30s. Env: PKGHUB_INDEX_TIMEOUT
    pub index_timeout: Option<String>,

    /// Upper bound for a single package archive download.
    /// Default: 60s. Env: PKGHUB_ARCHIVE_TIMEOUT
    pub archive_timeout: Option<String>,

    /// User agent sent with every request.
    pub user_agent: Option<String>,

    /// Fuzzy search strictness, 0 accepts only exact matches and 1 accepts anything.
    /// Default: 0.4
    pub search_threshold: Option<f64>,

    /// Package names highlighted on the front page, in display order.
    pub featured: Option<Vec<String>>,
}

/// Path of the configuration file: `$PKGHUB_CONFIG` or
/// `$XDG_CONFIG_HOME/pkghub/config.toml`.
pub fn config_path() -> PathBuf {
    match std::env::var("PKGHUB_CONFIG") {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => xdg_config_home().join("pkghub").join("config.toml"),
    }
}

impl Config {
    pub fn default_config() -> Self {
        Self {
            index_url: Some(DEFAULT_INDEX_URL.to_string()),
            index_timeout: Some(DEFAULT_INDEX_TIMEOUT.to_string()),
            archive_timeout: Some(DEFAULT_ARCHIVE_TIMEOUT.to_string()),
            user_agent: Some(default_user_agent()),
            search_threshold: Some(DEFAULT_SEARCH_THRESHOLD),
            featured: Some(DEFAULT_FEATURED.iter().map(|s| s.to_string()).collect()),
        }
    }

    /// Loads the configuration from [`config_path`], falling back to the
    /// defaults when the file does not exist, then applies environment
    /// overrides and validates the result.
    pub fn new() -> Result<Self> {
        let path = config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(content) => {
                debug!(path = %path.display(), "loading configuration");
                Self::from_toml(&content)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(path = %path.display(), "no configuration file, using defaults");
                Self::default()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.apply_env_overrides();
        config.resolve()?;
        Ok(config)
    }

    /// Loads an explicitly requested configuration file. Unlike [`Config::new`]
    /// a missing file is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading configuration");
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides();
        config.resolve()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = non_empty_env("PACKAGE_INDEX_URL") {
            self.index_url = Some(url);
        }
        if let Some(timeout) = non_empty_env("PKGHUB_INDEX_TIMEOUT") {
            self.index_timeout = Some(timeout);
        }
        if let Some(timeout) = non_empty_env("PKGHUB_ARCHIVE_TIMEOUT") {
            self.archive_timeout = Some(timeout);
        }
    }

    /// Fills unset fields with their defaults and validates every value.
    pub fn resolve(&mut self) -> Result<()> {
        let url = self
            .index_url
            .get_or_insert_with(|| DEFAULT_INDEX_URL.to_string());
        let parsed = Url::parse(url).map_err(|source| {
            ConfigError::InvalidIndexUrl {
                url: url.clone(),
                source,
            }
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(parsed.scheme().to_string()));
        }

        let index_timeout = self
            .index_timeout
            .get_or_insert_with(|| DEFAULT_INDEX_TIMEOUT.to_string());
        if parse_duration(index_timeout).is_none() {
            return Err(ConfigError::InvalidDuration {
                field: "index_timeout",
                value: index_timeout.clone(),
            });
        }

        let archive_timeout = self
            .archive_timeout
            .get_or_insert_with(|| DEFAULT_ARCHIVE_TIMEOUT.to_string());
        if parse_duration(archive_timeout).is_none() {
            return Err(ConfigError::InvalidDuration {
                field: "archive_timeout",
                value: archive_timeout.clone(),
            });
        }

        let threshold = *self.search_threshold.get_or_insert(DEFAULT_SEARCH_THRESHOLD);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidThreshold(threshold));
        }

        self.user_agent.get_or_insert_with(default_user_agent);
        self.featured
            .get_or_insert_with(|| DEFAULT_FEATURED.iter().map(|s| s.to_string()).collect());

        Ok(())
    }

    pub fn get_index_url(&self) -> &str {
        self.index_url.as_deref().unwrap_or(DEFAULT_INDEX_URL)
    }

    pub fn get_index_timeout(&self) -> Duration {
        self.index_timeout
            .as_deref()
            .and_then(parse_duration)
            .unwrap_or(Duration::from_secs(30))
    }

    pub fn get_archive_timeout(&self) -> Duration {
        self.archive_timeout
            .as_deref()
            .and_then(parse_duration)
            .unwrap_or(Duration::from_secs(60))
    }

    pub fn get_user_agent(&self) -> String {
        self.user_agent.clone().unwrap_or_else(default_user_agent)
    }

    pub fn get_search_threshold(&self) -> f64 {
        self.search_threshold.unwrap_or(DEFAULT_SEARCH_THRESHOLD)
    }

    pub fn get_featured(&self) -> Vec<String> {
        self.featured
            .clone()
            .unwrap_or_else(|| DEFAULT_FEATURED.iter().map(|s| s.to_string()).collect())
    }
}

fn default_user_agent() -> String {
    format!("pkghub/{}", env!("CARGO_PKG_VERSION"))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
