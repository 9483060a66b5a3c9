//! Simulator configuration.
//!
//! Read from JSON or from the environment:
//!
//! ```json
//! { "seed": 42, "deprecation_policy": "error" }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::deprecation::{self, DEPRECATION_ENV, DeprecationError, DeprecationPolicy};

/// Environment variable holding the random seed.
pub const SEED_ENV: &str = "YAO_SIM_SEED";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
    #[error(transparent)]
    Deprecation(#[from] DeprecationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for the simulator's random source; `None` seeds from entropy.
    pub seed: Option<u64>,
    pub deprecation_policy: DeprecationPolicy,
}

impl SimConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    ///
    /// # Example
    /// ```
    /// use yao_sim::config::SimConfig;
    /// use yao_sim::deprecation::DeprecationPolicy;
    ///
    /// let config = SimConfig::from_json(r#"{"seed": 7, "deprecation_policy": "once"}"#).unwrap();
    /// assert_eq!(config.seed, Some(7));
    /// assert_eq!(config.deprecation_policy, DeprecationPolicy::WarnOnce);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read [`SEED_ENV`] and [`DEPRECATION_ENV`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let seed = match std::env::var(SEED_ENV) {
            Ok(value) => Some(value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: SEED_ENV,
                value,
            })?),
            Err(_) => None,
        };
        let deprecation_policy = match std::env::var(DEPRECATION_ENV) {
            Ok(value) => value.parse()?,
            Err(_) => DeprecationPolicy::default(),
        };
        Ok(SimConfig {
            seed,
            deprecation_policy,
        })
    }

    /// Install the configured deprecation policy process-wide.
    pub fn apply_policy(&self) {
        deprecation::set_policy(self.deprecation_policy);
    }
}
