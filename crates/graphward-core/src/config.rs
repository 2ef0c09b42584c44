//! Runtime configuration for the secured layer.
//!
//! Only two values are tunable: the decision-cache capacity and whether the
//! query rewriter degrades to an empty result instead of failing when
//! graph-level read is denied. Everything else is the evaluator's business.
//!
//! Example:
//! ```toml
//! cache_capacity = 500
//! silent_fail = true
//! ```

use std::num::NonZeroUsize;
use std::path::Path;

use serde::{Deserialize, Serialize};

use graphward_contracts::error::{SecurityError, SecurityResult};

/// Default number of decisions kept per unit of work.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Maximum cached decisions per unit of work. Least-recently-used entries
    /// are evicted beyond this. Must be positive.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// When true, a graph-level read denial during query rewriting yields an
    /// empty plan instead of `PermissionDenied`.
    #[serde(default)]
    pub silent_fail: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            silent_fail: false,
        }
    }
}

impl SecurityConfig {
    /// Parse `s` as TOML and validate it.
    ///
    /// Returns `SecurityError::ConfigError` if the TOML is malformed or the
    /// capacity is zero.
    pub fn from_toml_str(s: &str) -> SecurityResult<Self> {
        let config: SecurityConfig = toml::from_str(s).map_err(|e| SecurityError::ConfigError {
            reason: format!("failed to parse security config TOML: {}", e),
        })?;
        config.cache_capacity()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it with [`SecurityConfig::from_toml_str`].
    pub fn from_file(path: &Path) -> SecurityResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SecurityError::ConfigError {
            reason: format!("failed to read security config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The validated cache capacity.
    pub fn cache_capacity(&self) -> SecurityResult<NonZeroUsize> {
        NonZeroUsize::new(self.cache_capacity).ok_or_else(|| SecurityError::ConfigError {
            reason: "cache_capacity must be a positive integer".to_string(),
        })
    }
}
