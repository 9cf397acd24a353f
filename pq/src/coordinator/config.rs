//! Coordinator configuration

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Pre-sized capacity of the pending queue (tuning only)
    #[serde(rename = "initial-queue-capacity", default = "default_initial_queue_capacity")]
    pub initial_queue_capacity: usize,

    /// Channel buffer size for coordinator requests
    #[serde(rename = "channel-buffer", default = "default_channel_buffer")]
    pub channel_buffer: usize,

    /// Queued outbound bytes at which writes report backpressure
    #[serde(rename = "write-high-water-mark", default = "default_write_high_water_mark")]
    pub write_high_water_mark: usize,
}

fn default_initial_queue_capacity() -> usize {
    debug!("default_initial_queue_capacity: called");
    16
}

fn default_channel_buffer() -> usize {
    debug!("default_channel_buffer: called");
    1000
}

fn default_write_high_water_mark() -> usize {
    debug!("default_write_high_water_mark: called");
    64 * 1024 // 64KB
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        debug!("CoordinatorConfig::default: called");
        Self {
            initial_queue_capacity: 16,
            channel_buffer: 1000,
            write_high_water_mark: 64 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.initial_queue_capacity, 16);
        assert_eq!(config.channel_buffer, 1000);
        assert_eq!(config.write_high_water_mark, 64 * 1024);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: CoordinatorConfig = serde_yaml::from_str("channel-buffer: 8").unwrap();
        assert_eq!(config.channel_buffer, 8);
        assert_eq!(config.initial_queue_capacity, 16);
        assert_eq!(config.write_high_water_mark, 64 * 1024);
    }
}
