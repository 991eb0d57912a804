//! Provider configuration resolution
//!
//! Each value comes from the provider block first, then the environment,
//! then a built-in default.

use std::path::PathBuf;

use thiserror::Error;
use tfplug::types::{AttributePath, DynamicValue};
use url::Url;

pub const ATTR_API_KEY: &str = "api_key";
pub const ATTR_API_BASE_URL: &str = "api_base_url";
pub const ATTR_LOCAL_DIR: &str = "local_dir";

pub const ENV_API_KEY: &str = "OMDB_API_KEY";
pub const ENV_API_BASE_URL: &str = "OMDB_API_BASE_URL";
pub const ENV_LOCAL_DIR: &str = "OMDB_LOCAL_DIR";

pub const DEFAULT_API_BASE_URL: &str = "https://www.omdbapi.com/";
pub const DEFAULT_LOCAL_DIR_NAME: &str = "terraform-provider-omdb";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("api_key is required (set in provider config or OMDB_API_KEY env var)")]
    MissingApiKey,

    #[error("invalid api_base_url {value:?}: {source}")]
    InvalidBaseUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("api_base_url must use http or https, got {0:?}")]
    UnsupportedScheme(String),

    #[error("invalid provider configuration: {0}")]
    Attribute(#[from] tfplug::TfplugError),
}

impl ConfigError {
    pub fn attribute(&self) -> Option<AttributePath> {
        match self {
            ConfigError::MissingApiKey => Some(AttributePath::new(ATTR_API_KEY)),
            ConfigError::InvalidBaseUrl { .. } | ConfigError::UnsupportedScheme(_) => {
                Some(AttributePath::new(ATTR_API_BASE_URL))
            }
            ConfigError::Attribute(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub api_base_url: Url,
    pub local_dir: PathBuf,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("local_dir", &self.local_dir)
            .finish()
    }
}

impl ProviderConfig {
    pub fn from_config(config: &DynamicValue) -> Result<Self, ConfigError> {
        let api_key = resolve(config, ATTR_API_KEY, ENV_API_KEY)?
            .ok_or(ConfigError::MissingApiKey)?;

        let base_url = resolve(config, ATTR_API_BASE_URL, ENV_API_BASE_URL)?
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = parse_base_url(&base_url)?;

        let local_dir = resolve(config, ATTR_LOCAL_DIR, ENV_LOCAL_DIR)?
            .map(PathBuf::from)
            .unwrap_or_else(default_local_dir);

        Ok(Self {
            api_key,
            api_base_url,
            local_dir,
        })
    }
}

pub fn default_local_dir() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_LOCAL_DIR_NAME)
}

pub fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|source| ConfigError::InvalidBaseUrl {
        value: value.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::UnsupportedScheme(other.to_string())),
    }
}

/// Empty strings count as unset at every layer
fn resolve(config: &DynamicValue, attr: &str, env: &str) -> Result<Option<String>, ConfigError> {
    let from_config = if config.is_null() {
        None
    } else {
        config.get_string_opt(&AttributePath::new(attr))?
    };

    Ok(from_config
        .filter(|v| !v.is_empty())
        .or_else(|| std::env::var(env).ok().filter(|v| !v.is_empty())))
}
