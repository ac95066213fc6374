//! Engine configuration
//!
//! A single versioned YAML document controls the closure budget, the size of
//! the metadata worker pool and how the package registry is reached:
//!
//! ```yaml
//! version: 1
//! release: epel9
//! max_deps: 20
//! workers: 2
//! week_limit: 6
//! registry:
//!   base_url: https://src.fedoraproject.org
//!   namespace: rpms
//!   branch: rawhide
//! ```
//!
//! Every field except `version` is optional. A `release` preset supplies the
//! registry branch and the repository locations; fields that are not set fall
//! back to the preset, then to [`EngineConfig::default`]. An explicit
//! `registry` section is taken as written, branch included. A handful of environment variables override the
//! file for one-off runs (see [`EngineConfig::apply_env_overrides`]).

pub mod error;
pub mod preset;

pub use error::{ConfigError, ConfigResult};
pub use preset::{ReleasePreset, SnapshotSources};

use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SUPPORTED_VERSIONS: &[u32] = &[1];

pub const ENV_MAX_DEPS: &str = "DEPCLOSURE_MAX_DEPS";
pub const ENV_WORKERS: &str = "DEPCLOSURE_WORKERS";
pub const ENV_REGISTRY_URL: &str = "DEPCLOSURE_REGISTRY_URL";
pub const ENV_RELEASE: &str = "DEPCLOSURE_RELEASE";

const MAX_WORKERS: usize = 64;
const MAX_ATTEMPTS: u32 = 100;

/// Package registry connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    pub base_url: String,
    pub namespace: String,
    /// Branch the report is about (only used for log context)
    pub branch: String,
    /// Total attempts per package, including the first one
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://src.fedoraproject.org".to_string(),
            namespace: "rpms".to_string(),
            branch: "rawhide".to_string(),
            max_attempts: 20,
            backoff_ms: 1000,
            max_backoff_ms: 20_000,
            timeout_secs: 30,
        }
    }
}

/// Closure engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum distinct dependent source packages tracked per root.
    /// Zero or negative truncates every root after its first expansion.
    pub max_deps: i64,
    /// Metadata enrichment worker count
    pub workers: usize,
    /// Weeks without a status change after which a root counts as stale
    pub week_limit: u32,
    pub release: Option<ReleasePreset>,
    pub sources: SnapshotSources,
    pub registry: RegistryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_deps: 20,
            workers: 2,
            week_limit: 6,
            release: None,
            sources: SnapshotSources::default(),
            registry: RegistryConfig::default(),
        }
    }
}

/// YAML schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFileV1 {
    version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    release: Option<ReleasePreset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_deps: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    workers: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    week_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sources: Option<SnapshotSources>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    registry: Option<RegistryConfig>,
}

impl EngineConfig {
    /// Defaults with the branch and repository locations of `release`
    pub fn for_release(release: ReleasePreset) -> Self {
        let mut config = Self::default();
        config.apply_release(release);
        config
    }

    fn apply_release(&mut self, release: ReleasePreset) {
        self.release = Some(release);
        self.sources = release.sources();
        self.registry.branch = release.branch().to_string();
    }

    /// Load and validate a configuration file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let file: ConfigFileV1 = serde_yaml::from_str(content)?;

        let version = file.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let defaults = file.release.map(Self::for_release).unwrap_or_default();
        let config = Self {
            max_deps: file.max_deps.unwrap_or(defaults.max_deps),
            workers: file.workers.unwrap_or(defaults.workers),
            week_limit: file.week_limit.unwrap_or(defaults.week_limit),
            release: defaults.release,
            sources: file.sources.unwrap_or(defaults.sources),
            registry: file.registry.unwrap_or(defaults.registry),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        let file = ConfigFileV1 {
            version: Some(1),
            release: self.release,
            max_deps: Some(self.max_deps),
            workers: Some(self.workers),
            week_limit: Some(self.week_limit),
            sources: (!self.sources.is_empty()).then(|| self.sources.clone()),
            registry: Some(self.registry.clone()),
        };
        serde_yaml::to_string(&file).map_err(ConfigError::Yaml)
    }

    /// Apply `DEPCLOSURE_*` environment overrides, then re-validate.
    pub fn apply_env_overrides(mut self) -> ConfigResult<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())?;
        self.validate()?;
        Ok(self)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_RELEASE) {
            self.apply_release(ReleasePreset::from_str(raw.trim())?);
        }
        if let Some(raw) = lookup(ENV_MAX_DEPS) {
            self.max_deps = raw.trim().parse().map_err(|_| {
                ConfigError::Custom(format!("{ENV_MAX_DEPS} must be an integer, got '{raw}'"))
            })?;
        }
        if let Some(raw) = lookup(ENV_WORKERS) {
            self.workers = raw.trim().parse().map_err(|_| {
                ConfigError::Custom(format!(
                    "{ENV_WORKERS} must be a positive integer, got '{raw}'"
                ))
            })?;
        }
        if let Some(url) = lookup(ENV_REGISTRY_URL) {
            self.registry.base_url = url;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(ConfigError::range_with_hint(
                "workers",
                self.workers,
                1,
                MAX_WORKERS,
                "The registry is slow; two workers are usually enough.",
            ));
        }

        let registry = &self.registry;
        if registry.max_attempts == 0 || registry.max_attempts > MAX_ATTEMPTS {
            return Err(ConfigError::range_with_hint(
                "registry.max_attempts",
                registry.max_attempts,
                1,
                MAX_ATTEMPTS,
                "Counts the first request, so 1 disables retries.",
            ));
        }
        if registry.max_backoff_ms < registry.backoff_ms {
            return Err(ConfigError::range_with_hint(
                "registry.max_backoff_ms",
                registry.max_backoff_ms,
                registry.backoff_ms,
                u64::MAX,
                "The backoff cap must not be below the initial backoff.",
            ));
        }
        if registry.base_url.trim().is_empty() {
            return Err(ConfigError::Custom(
                "registry.base_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
