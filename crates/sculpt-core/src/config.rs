//! Configuration
//!
//! `SculptConfig` is loaded from TOML, then environment overrides are applied:
//! - `SCULPT_MODEL`, `SCULPT_LLM_ENDPOINT`, `SCULPT_LLM_API_KEY`
//! - `SCULPT_ASSET_TOKEN`
//!
//! A missing file yields defaults; a malformed one is an error.

use sculpt_import::AssetConfig;
use sculpt_interpreter::InterpreterConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the model name
pub const ENV_MODEL: &str = "SCULPT_MODEL";
/// Environment variable overriding the chat endpoint
pub const ENV_LLM_ENDPOINT: &str = "SCULPT_LLM_ENDPOINT";
/// Environment variable carrying the chat API key
pub const ENV_LLM_API_KEY: &str = "SCULPT_LLM_API_KEY";
/// Environment variable carrying the asset service token
pub const ENV_ASSET_TOKEN: &str = "SCULPT_ASSET_TOKEN";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File exists but could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parse but make no sense
    #[error("invalid configuration value: {0}")]
    Invalid(String),
}

/// What happens when a command arrives while another one runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyPolicy {
    /// Wait for the running command
    #[default]
    Queue,
    /// Fail fast with `PipelineError::Busy`
    Reject,
}

/// How `search` actions pick a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Import the top-ranked candidate right away
    Best,
    /// Offer the top candidates and wait for a choice
    Offer {
        /// Candidates offered
        count: usize,
    },
}

/// Serialized form of [`SearchMode`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchModeKind {
    /// See [`SearchMode::Best`]
    #[default]
    Best,
    /// See [`SearchMode::Offer`]
    Offer,
}

/// `[assets]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsSection {
    /// Service connection settings
    #[serde(flatten)]
    pub service: AssetConfig,
    /// Candidate selection
    pub search_mode: SearchModeKind,
    /// Candidates offered in `offer` mode
    pub offer_count: usize,
}

impl Default for AssetsSection {
    fn default() -> Self {
        Self {
            service: AssetConfig::default(),
            search_mode: SearchModeKind::Best,
            offer_count: 5,
        }
    }
}

impl AssetsSection {
    /// Effective search mode
    #[must_use]
    pub fn search_mode(&self) -> SearchMode {
        match self.search_mode {
            SearchModeKind::Best => SearchMode::Best,
            SearchModeKind::Offer => SearchMode::Offer {
                count: self.offer_count,
            },
        }
    }
}

/// `[pipeline]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Behavior under concurrent commands
    pub concurrency: ConcurrencyPolicy,
    /// Seed for default positions; random when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SculptConfig {
    /// Language-model settings
    pub interpreter: InterpreterConfig,
    /// Asset service settings
    pub assets: AssetsSection,
    /// Command pipeline settings
    pub pipeline: PipelineSection,
}

impl SculptConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a file (defaults when absent) and apply environment overrides
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file exists but cannot be read
    /// - `ConfigError::Parse` / `ConfigError::Invalid` for bad contents
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => match std::fs::read_to_string(path) {
                Ok(text) => Self::from_toml_str(&text)?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "config file not found, using defaults");
                    Self::default()
                }
                Err(source) => {
                    return Err(ConfigError::Io {
                        path: path.to_path_buf(),
                        source,
                    })
                }
            },
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML without touching the environment
    ///
    /// # Errors
    /// - `ConfigError::Parse` for malformed TOML
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply overrides from a variable lookup
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(model) = get(ENV_MODEL) {
            self.interpreter.model = model;
        }
        if let Some(endpoint) = get(ENV_LLM_ENDPOINT) {
            self.interpreter.endpoint = endpoint;
        }
        if let Some(key) = get(ENV_LLM_API_KEY) {
            self.interpreter.api_key = Some(key);
        }
        if let Some(token) = get(ENV_ASSET_TOKEN) {
            self.assets.service.token = Some(token);
        }
    }

    /// Reject values that cannot work
    ///
    /// # Errors
    /// - `ConfigError::Invalid` naming the first bad value
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interpreter.timeout_secs == 0 {
            return Err(ConfigError::Invalid("interpreter.timeout_secs must be positive".into()));
        }
        if self.interpreter.max_snapshot_objects == 0 {
            return Err(ConfigError::Invalid(
                "interpreter.max_snapshot_objects must be positive".into(),
            ));
        }
        if self.assets.service.timeout_secs == 0 {
            return Err(ConfigError::Invalid("assets.timeout_secs must be positive".into()));
        }
        if self.assets.search_mode == SearchModeKind::Offer && self.assets.offer_count == 0 {
            return Err(ConfigError::Invalid("assets.offer_count must be positive".into()));
        }
        Ok(())
    }

    /// With concurrency policy
    #[inline]
    #[must_use]
    pub fn with_concurrency(mut self, policy: ConcurrencyPolicy) -> Self {
        self.pipeline.concurrency = policy;
        self
    }

    /// With seeded default positions
    #[inline]
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.pipeline.rng_seed = Some(seed);
        self
    }

    /// With offer-style search
    #[inline]
    #[must_use]
    pub fn with_offer_count(mut self, count: usize) -> Self {
        self.assets.search_mode = SearchModeKind::Offer;
        self.assets.offer_count = count;
        self
    }
}
