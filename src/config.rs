use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::conflation::ConflationConfig;
use crate::error::KgError;
use crate::nodenorm::DEFAULT_NODENORM_ENDPOINT;

pub const CONFIG_FILE_NAME: &str = "kira-kg.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub nodenorm: Option<NodeNormEntry>,
    #[serde(default)]
    pub conflation: Option<ConflationConfig>,
    #[serde(default)]
    pub cache: Option<CacheEntry>,
    #[serde(default)]
    pub merge_duplicates: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct NodeNormEntry {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CacheEntry {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeNormSettings {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
}

impl Default for NodeNormSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_NODENORM_ENDPOINT.to_string(),
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub path: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub nodenorm: NodeNormSettings,
    pub conflation: ConflationConfig,
    pub cache: CacheSettings,
    pub merge_duplicates: bool,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ConfigLoader::resolve_config(Config::default())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load `path`, or `kira-kg.json` from the working directory when present.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, KgError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE_NAME),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(ResolvedConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| KgError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| KgError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        let defaults = NodeNormSettings::default();
        let nodenorm = match config.nodenorm {
            Some(entry) => NodeNormSettings {
                endpoint: entry.endpoint.unwrap_or(defaults.endpoint),
                timeout_secs: entry.timeout_secs.unwrap_or(defaults.timeout_secs),
                max_retries: entry.max_retries.unwrap_or(defaults.max_retries),
            },
            None => defaults,
        };

        let cache = match config.cache {
            Some(entry) => CacheSettings {
                enabled: entry.enabled.unwrap_or(false),
                path: entry.path.map(Utf8PathBuf::from),
            },
            None => CacheSettings {
                enabled: false,
                path: None,
            },
        };

        ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            nodenorm,
            conflation: config.conflation.unwrap_or_default(),
            cache,
            merge_duplicates: config.merge_duplicates.unwrap_or(false),
        }
    }
}

/// `<user cache dir>/kira-kg-normalizer/nodenorm-cache.json`.
pub fn default_cache_path() -> Result<Utf8PathBuf, KgError> {
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(
                dirs.cache_dir()
                    .join("kira-kg-normalizer")
                    .join("nodenorm-cache.json"),
            )
            .ok()
        })
        .ok_or_else(|| KgError::Filesystem("unable to resolve cache directory".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default());
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.nodenorm, NodeNormSettings::default());
        assert_eq!(resolved.conflation, ConflationConfig::default());
        assert!(!resolved.cache.enabled);
        assert!(!resolved.merge_duplicates);
    }
}
