use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ResolverError;

/// Environment variable overriding `resolver.file_root`
pub const FILE_ROOT_ENV: &str = "IDRESOLVER_FILE_ROOT";
/// Environment variable overriding `cache.path`
pub const CACHE_FILE_ENV: &str = "IDRESOLVER_CACHE_FILE";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Directory prefix every source file name is appended to (e.g. "/data/")
    #[serde(default)]
    pub file_root: Option<String>,
    /// Feature classes populated when a caller does not name any
    #[serde(default = "default_feature_classes")]
    pub default_feature_classes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

// Default value functions
fn default_feature_classes() -> Vec<String> { vec!["gene".to_string()] }
fn default_cache_enabled() -> bool { true }
fn default_cache_path() -> PathBuf { PathBuf::from("build/idresolver.cache") }

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            file_root: None,
            default_feature_classes: default_feature_classes(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            path: default_cache_path(),
        }
    }
}

impl Config {
    /// Apply IDRESOLVER_* environment variables on top of the file values
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(root) = std::env::var(FILE_ROOT_ENV) {
            self.resolver.file_root = Some(root);
        }
        if let Ok(path) = std::env::var(CACHE_FILE_ENV) {
            self.cache.path = PathBuf::from(path);
        }
        self
    }

    /// Trimmed source root, or None when it is absent or blank
    pub fn file_root(&self) -> Option<&str> {
        self.resolver
            .file_root
            .as_deref()
            .map(str::trim)
            .filter(|root| !root.is_empty())
    }

    /// Location of the raw file for a source: root and suffix are concatenated, not joined
    pub fn source_file(&self, suffix: &str) -> Option<PathBuf> {
        self.file_root()
            .map(|root| PathBuf::from(format!("{}{}", root, suffix)))
    }
}

pub fn default_config() -> Config {
    Config::default()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ResolverError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| ResolverError::Config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), ResolverError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| ResolverError::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}
