use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CLASSIFIER_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_ROSTER_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_SUBMIT_TIMEOUT_MS: u64 = 10_000;

/// Timeouts bounding every collaborator call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Whole classifier job: invocation plus draining the result stream.
    pub classifier_timeout_ms: u64,
    pub roster_timeout_ms: u64,
    pub submit_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            classifier_timeout_ms: DEFAULT_CLASSIFIER_TIMEOUT_MS,
            roster_timeout_ms: DEFAULT_ROSTER_TIMEOUT_MS,
            submit_timeout_ms: DEFAULT_SUBMIT_TIMEOUT_MS,
        }
    }
}

impl EngineConfig {
    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_millis(self.classifier_timeout_ms)
    }

    pub fn roster_timeout(&self) -> Duration {
        Duration::from_millis(self.roster_timeout_ms)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str("classifier_timeout_ms = 500").unwrap();
        assert_eq!(config.classifier_timeout(), Duration::from_millis(500));
        assert_eq!(config.roster_timeout_ms, DEFAULT_ROSTER_TIMEOUT_MS);
        assert_eq!(config.submit_timeout_ms, DEFAULT_SUBMIT_TIMEOUT_MS);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
