//! Application configuration.
//!
//! Settings are layered with figment, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config FILE`, or `config.toml` in the platform config
//!    directory)
//! 3. `DUPELENS_*` environment variables (e.g. `DUPELENS_CHUNK_SIZE=100`)
//! 4. Command-line flags, applied with [`Config::merge_scan_args`]
//!
//! ```toml
//! mode = "visual"
//! chunk_size = 50
//! workers_per_pool = 2
//! exact_algorithm = "sha256"
//! perceptual_fallback = false
//! request_timeout_ms = 30000
//! removal_delay_ms = 0
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::ScanArgs;
use crate::dispatch::DispatchConfig;
use crate::duplicates::{FinderConfig, DEFAULT_CHUNK_SIZE};
use crate::scanner::{ExactAlgorithm, MatchMode, WalkerConfig};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "DUPELENS_";

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// A provider could not be read or a value has the wrong type.
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// A value is out of range.
    #[error("invalid value for '{key}': {message}")]
    Invalid {
        /// Setting name
        key: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// The effective configuration could not be rendered as TOML.
    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Effective settings for a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Matching mode
    pub mode: MatchMode,
    /// Items dispatched per chunk
    pub chunk_size: usize,
    /// Worker threads per fingerprint family
    pub workers_per_pool: usize,
    /// Digest used for exact matching
    pub exact_algorithm: ExactAlgorithm,
    /// Hash undecodable images exactly instead of treating them as unique
    pub perceptual_fallback: bool,
    /// Per-item fingerprint timeout; unset waits indefinitely
    pub request_timeout_ms: Option<u64>,
    /// Delay before a removal is applied
    pub removal_delay_ms: u64,
    /// Follow symbolic links while walking
    pub follow_symlinks: bool,
    /// Skip hidden files and directories
    pub skip_hidden: bool,
    /// Minimum file size to consider
    pub min_size: Option<u64>,
    /// Maximum file size to consider
    pub max_size: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        let dispatch = DispatchConfig::default();
        Self {
            mode: MatchMode::Exact,
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers_per_pool: dispatch.workers_per_pool,
            exact_algorithm: dispatch.exact_algorithm,
            perceptual_fallback: dispatch.perceptual_fallback,
            request_timeout_ms: None,
            removal_delay_ms: 0,
            follow_symlinks: false,
            skip_hidden: false,
            min_size: None,
            max_size: None,
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `path` is `None`.
    ///
    /// A missing default file is not an error; a missing explicit file is.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is missing or a value fails to parse.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if !path.exists() => Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Self::load_from_path(path),
            None => match Self::default_path() {
                Some(path) => Self::load_from_path(&path),
                None => Self::figment(None).extract().map_err(|e| Box::new(e).into()),
            },
        }
    }

    /// Load defaults, then `path` if it exists, then the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if a value fails to parse.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        log::debug!("Loading configuration from {}", path.display());
        Self::figment(Some(path))
            .extract()
            .map_err(|e| Box::new(e).into())
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// `config.toml` in the platform configuration directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "dupelens", "dupelens")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Apply command-line overrides.
    pub fn merge_scan_args(&mut self, args: &ScanArgs) {
        if let Some(mode) = args.mode {
            self.mode = mode;
        }
        if let Some(algorithm) = args.algorithm {
            self.exact_algorithm = algorithm;
        }
        if let Some(chunk_size) = args.chunk_size {
            self.chunk_size = chunk_size;
        }
        if let Some(workers) = args.workers {
            self.workers_per_pool = workers;
        }
        if args.request_timeout_ms.is_some() {
            self.request_timeout_ms = args.request_timeout_ms;
        }
        if let Some(delay) = args.removal_delay_ms {
            self.removal_delay_ms = delay;
        }
        if args.min_size.is_some() {
            self.min_size = args.min_size;
        }
        if args.max_size.is_some() {
            self.max_size = args.max_size;
        }
        self.perceptual_fallback |= args.perceptual_fallback;
        self.follow_symlinks |= args.follow_symlinks;
        self.skip_hidden |= args.skip_hidden;
    }

    /// Reject settings the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid {
                key: "chunk_size",
                message: "must be at least 1".to_string(),
            });
        }
        if self.workers_per_pool == 0 {
            return Err(ConfigError::Invalid {
                key: "workers_per_pool",
                message: "must be at least 1".to_string(),
            });
        }
        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid {
                key: "request_timeout_ms",
                message: "must be positive; omit it to wait indefinitely".to_string(),
            });
        }
        if let (Some(min), Some(max)) = (self.min_size, self.max_size) {
            if min > max {
                return Err(ConfigError::Invalid {
                    key: "min_size",
                    message: format!("{min} is larger than max_size {max}"),
                });
            }
        }
        Ok(())
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Render`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Worker pool settings.
    #[must_use]
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            workers_per_pool: self.workers_per_pool,
            exact_algorithm: self.exact_algorithm,
            perceptual_fallback: self.perceptual_fallback,
        }
    }

    /// Finder settings, without shutdown flag or progress callback.
    #[must_use]
    pub fn finder_config(&self) -> FinderConfig {
        FinderConfig::default()
            .with_mode(self.mode)
            .with_chunk_size(self.chunk_size)
            .with_dispatch(self.dispatch_config())
            .with_request_timeout(self.request_timeout_ms.map(Duration::from_millis))
    }

    /// Directory walking settings.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig {
            follow_symlinks: self.follow_symlinks,
            skip_hidden: self.skip_hidden,
            min_size: self.min_size,
            max_size: self.max_size,
        }
    }

    /// Delay before a removal is applied.
    #[must_use]
    pub fn removal_delay(&self) -> Duration {
        Duration::from_millis(self.removal_delay_ms)
    }
}
