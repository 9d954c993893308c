use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::DexError;
use crate::service::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, Transport};

/// Optional `pokedex.json` settings file. Every field has a default, and the
/// file itself may be absent when no explicit path was given.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub transport: Option<TransportSetting>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportSetting {
    Normal,
    Stubbed,
    AuthFailure,
    Logging,
}

impl From<TransportSetting> for Transport {
    fn from(value: TransportSetting) -> Self {
        match value {
            TransportSetting::Normal => Transport::Normal,
            TransportSetting::Stubbed => Transport::Stubbed,
            TransportSetting::AuthFailure => Transport::AuthFailure,
            TransportSetting::Logging => Transport::Logging,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub transport: Transport,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            transport: Transport::Normal,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolve settings from `path` or the default `pokedex.json`. An absent
    /// file at the default path falls back to defaults; an explicit path
    /// that cannot be read is an error.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, DexError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from("pokedex.json"),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(ResolvedConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| DexError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| DexError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        let defaults = ResolvedConfig::default();
        ResolvedConfig {
            base_url: config.base_url.unwrap_or(defaults.base_url),
            timeout_secs: config.timeout_secs.unwrap_or(defaults.timeout_secs),
            transport: config
                .transport
                .map(Transport::from)
                .unwrap_or(defaults.transport),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_resolves_to_defaults() {
        let config = Config {
            base_url: None,
            timeout_secs: None,
            transport: None,
        };
        let resolved = ConfigLoader::resolve_config(config);
        assert_eq!(resolved.base_url, DEFAULT_BASE_URL);
        assert_eq!(resolved.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(resolved.transport, Transport::Normal);
    }

    #[test]
    fn transport_setting_parses_kebab_case() {
        let config: Config =
            serde_json::from_str(r#"{ "transport": "auth-failure", "timeout_secs": 5 }"#).unwrap();
        let resolved = ConfigLoader::resolve_config(config);
        assert_eq!(resolved.transport, Transport::AuthFailure);
        assert_eq!(resolved.timeout_secs, 5);
    }
}
