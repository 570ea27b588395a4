//! Configuration for the extraction pipeline

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded polling schedule for one analysis task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Maximum number of status requests
    pub max_attempts: u32,

    /// Delay between two status requests (milliseconds)
    pub interval_ms: u64,
}

impl PollConfig {
    /// Create a poll schedule
    pub const fn new(max_attempts: u32, interval_ms: u64) -> Self {
        Self {
            max_attempts,
            interval_ms,
        }
    }

    /// Delay between attempts as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Configuration for the extraction pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Maximum chunk size (characters)
    pub max_chunk_size: usize,

    /// Record count above which standardization is skipped
    pub standardize_threshold: usize,

    /// Polling for per-chunk extraction tasks
    pub chunk_poll: PollConfig,

    /// Polling for the standardization task
    pub standardize_poll: PollConfig,

    /// Polling for JSON repair tasks
    pub repair_poll: PollConfig,

    /// Protocol assumed when a record names none
    pub default_protocol: String,

    /// Data format assumed when a record names none
    pub default_data_format: String,

    /// Extraction method recorded in capability provenance
    pub extraction_method: String,

    /// Filename fragments that select the web-service-guide prompt
    pub service_guide_markers: Vec<String>,
}

impl ExtractorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chunk_size == 0 {
            return Err("max_chunk_size must be greater than 0".to_string());
        }
        for (name, poll) in [
            ("chunk_poll", &self.chunk_poll),
            ("standardize_poll", &self.standardize_poll),
            ("repair_poll", &self.repair_poll),
        ] {
            if poll.max_attempts == 0 {
                return Err(format!("{}.max_attempts must be greater than 0", name));
            }
        }
        if self.default_protocol.trim().is_empty() {
            return Err("default_protocol cannot be empty".to_string());
        }
        if self.default_data_format.trim().is_empty() {
            return Err("default_data_format cannot be empty".to_string());
        }
        if self.extraction_method.trim().is_empty() {
            return Err("extraction_method cannot be empty".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 80_000,
            standardize_threshold: 150,
            chunk_poll: PollConfig::new(60, 2000),
            standardize_poll: PollConfig::new(120, 2000),
            repair_poll: PollConfig::new(60, 2000),
            default_protocol: "HTTPS".to_string(),
            default_data_format: "XML".to_string(),
            extraction_method: "analysis-service".to_string(),
            service_guide_markers: vec!["clarity".to_string()],
        }
    }
}
