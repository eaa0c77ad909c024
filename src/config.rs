//! # Configuration
//!
//! Tunables for the connection resolver and the runtime. Every field has a default, so a
//! partial JSON document is enough.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub graph: GraphConfig,
    pub runtime: RuntimeConfig,
}

impl Config {
    /// Parse a configuration document. Missing sections and fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphConfig {
    /// Per-axis distance within which a notch and a divot may snap together.
    pub snap_radius: f64,
    /// Upper bound on hops for every chain traversal.
    pub max_chain_hops: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            snap_radius: 40.0,
            max_chain_hops: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Suspension before each loop condition check. Zero yields to the scheduler only.
    pub loop_interval_ms: u64,
}

impl RuntimeConfig {
    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { loop_interval_ms: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_defaults() {
        let config = Config::from_json_str(r#"{ "graph": { "snapRadius": 25.0 } }"#).unwrap();
        assert_eq!(config.graph.snap_radius, 25.0);
        assert_eq!(config.graph.max_chain_hops, 100);
        assert_eq!(config.runtime, RuntimeConfig::default());
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(Config::from_json_str("{}").unwrap(), Config::default());
    }
}
