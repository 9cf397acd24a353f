//! Connection configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// TCP connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Remote address (host:port)
    pub address: String,

    /// Connect timeout in milliseconds
    #[serde(rename = "connect-timeout-ms")]
    pub connect_timeout_ms: u64,

    /// Largest frame accepted in either direction, in bytes
    #[serde(rename = "max-frame-size")]
    pub max_frame_size: usize,

    /// Size of each socket read, in bytes
    #[serde(rename = "read-buffer-size")]
    pub read_buffer_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        debug!("ConnectionConfig::default: called");
        Self {
            address: "127.0.0.1:7878".to_string(),
            connect_timeout_ms: 5000,
            max_frame_size: 1024 * 1024,
            read_buffer_size: 8192,
        }
    }
}

impl ConnectionConfig {
    /// Get the connect timeout as a Duration
    pub fn connect_timeout(&self) -> Duration {
        debug!(connect_timeout_ms = %self.connect_timeout_ms, "ConnectionConfig::connect_timeout: called");
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Same settings, different address
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }
}
