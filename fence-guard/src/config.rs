//! Declarative guard configuration.
//!
//! The rule list is an ordered `[[rule]]` array in a TOML document; each
//! entry names its rule `type` and carries that rule's options. Resolution
//! order: the `FENCE_CONFIG` environment override, then `.fence/guards.toml`,
//! then `fence.toml` at the repository root.
//!
//! ```toml
//! [[rule]]
//! type = "allowed-dirs"
//! allow = ["src/**", "!**/target/**"]
//!
//! [[rule]]
//! type = "mtime-compare"
//! group_a = ["src/**"]
//! group_b = ["fence.toml"]
//! action = "warn"
//! epsilon_ms = 5000
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::rules::{
    AllowedDirs, AllowedDirsOptions, MtimeCompare, MtimeCompareOptions, UpstreamConflict,
    UpstreamConflictOptions,
};
use crate::Rule;

/// Environment variable overriding the configuration path.
pub const CONFIG_ENV: &str = "FENCE_CONFIG";

/// In-tree configuration paths probed in order when no override is set.
pub const CONFIG_PATHS: &[&str] = &[".fence/guards.toml", "fence.toml"];

/// Failure to locate, read or parse the configuration document.
///
/// Always fatal for the hook (exit code 2): partial enforcement from a
/// half-understood document would be worse than a loud failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No configuration document was found at any probed location.
    #[error("no guard configuration found (set {CONFIG_ENV} or add one of {CONFIG_PATHS:?})")]
    NotFound,
    /// The document exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The path that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The document is not valid configuration TOML.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// The path that failed to parse.
        path: PathBuf,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}

/// One configured rule instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RuleConfig {
    /// `type = "allowed-dirs"`
    AllowedDirs(AllowedDirsOptions),
    /// `type = "mtime-compare"`
    MtimeCompare(MtimeCompareOptions),
    /// `type = "upstream-conflict"`
    UpstreamConflict(UpstreamConflictOptions),
}

impl RuleConfig {
    fn build(self) -> Box<dyn Rule> {
        match self {
            RuleConfig::AllowedDirs(options) => Box::new(AllowedDirs::new(options)),
            RuleConfig::MtimeCompare(options) => Box::new(MtimeCompare::new(options)),
            RuleConfig::UpstreamConflict(options) => Box::new(UpstreamConflict::new(options)),
        }
    }
}

/// The parsed configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Rules in execution order.
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleConfig>,
}

impl Config {
    /// Resolve the configuration path for `cwd`.
    ///
    /// An explicit `FENCE_CONFIG` value is returned without an existence
    /// check so a broken override fails loudly on read instead of being
    /// silently skipped.
    pub fn resolve_path(cwd: &Path) -> Option<PathBuf> {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            if !env_path.is_empty() {
                return Some(cwd.join(env_path));
            }
        }
        CONFIG_PATHS.iter().map(|rel| cwd.join(rel)).find(|p| p.exists())
    }

    /// Load and parse the document at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Resolve and load the configuration for `cwd`.
    pub fn discover(cwd: &Path) -> Result<Self, ConfigError> {
        let path = Self::resolve_path(cwd).ok_or(ConfigError::NotFound)?;
        log::debug!("guard configuration at {path:?}");
        Self::load(&path)
    }

    /// Construct the rule list in configuration order.
    pub fn into_rules(self) -> Vec<Box<dyn Rule>> {
        self.rules.into_iter().map(RuleConfig::build).collect()
    }
}
