//! Application configuration management.
//!
//! Settings are layered with `figment`, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config FILE`, or `config.toml` in the platform config
//!    directory)
//! 3. `FINDEX_*` environment variables (`FINDEX_LOCK_TIMEOUT_MS=500`)
//! 4. Command-line flags
//!
//! # Example file
//!
//! ```toml
//! hash_algorithm = "blake3"
//! lock_timeout_ms = 2000
//! skip_hidden = true
//! ignore_patterns = ["*.tmp", "node_modules/"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::IndexArgs;
use crate::scanner::{HashAlgorithm, WalkerConfig};
use crate::store::StoreOptions;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "FINDEX_";

/// File name looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A layer could not be parsed or had the wrong shape.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    /// An explicitly requested file does not exist.
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hash algorithm for new indexes; `None` adopts the stored one.
    pub hash_algorithm: Option<HashAlgorithm>,
    /// How long to wait for a locked database, in milliseconds.
    pub lock_timeout_ms: u64,
    /// Follow symbolic links while indexing.
    pub follow_symlinks: bool,
    /// Skip hidden files and directories while indexing.
    pub skip_hidden: bool,
    /// Gitignore-style patterns excluded from every index run.
    pub ignore_patterns: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hash_algorithm: None,
            lock_timeout_ms: 0,
            follow_symlinks: false,
            skip_hidden: false,
            ignore_patterns: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from the file, environment and defaults.
    ///
    /// An explicit `path` must exist; the default location is optional.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a layer is malformed or an explicit file
    /// is missing.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                Some(path.to_path_buf())
            }
            None => Self::default_path().filter(|p| p.is_file()),
        };

        if let Some(file) = &file {
            log::debug!("Loading configuration from {}", file.display());
        }
        Self::figment(file.as_deref())
            .extract()
            .map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    /// The layered provider chain, without CLI flags.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Default platform-specific configuration file.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "findex").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Apply `index` flags on top of the loaded layers.
    ///
    /// Boolean flags only switch settings on; ignore patterns are appended.
    pub fn merge_index_args(&mut self, args: &IndexArgs) {
        if args.hash_algorithm.is_some() {
            self.hash_algorithm = args.hash_algorithm;
        }
        self.follow_symlinks |= args.follow_symlinks;
        self.skip_hidden |= args.skip_hidden;
        self.ignore_patterns
            .extend(args.ignore_patterns.iter().cloned());
    }

    /// Lock wait as a duration.
    #[must_use]
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Options for opening (and possibly creating) an index.
    #[must_use]
    pub fn store_options(&self) -> StoreOptions {
        let options = StoreOptions::default().with_lock_timeout(self.lock_timeout());
        match self.hash_algorithm {
            Some(algorithm) => options.with_algorithm(algorithm),
            None => options,
        }
    }

    /// Options for commands that only query an existing index.
    #[must_use]
    pub fn existing_store_options(&self) -> StoreOptions {
        StoreOptions::existing().with_lock_timeout(self.lock_timeout())
    }

    /// Traversal options for the indexer.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig::new(
            self.follow_symlinks,
            self.skip_hidden,
            self.ignore_patterns.clone(),
        )
    }
}
