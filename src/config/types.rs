// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Listener address, `host:port` or `:port`
    pub listen: String,
    /// Absolute path of the served directory
    pub root: String,
    pub workers: Option<usize>,
}

/// Connection timeouts, in seconds
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct PerformanceConfig {
    /// Time allowed to receive request headers
    pub read_timeout: u64,
    /// Time allowed to send one response
    pub write_timeout: u64,
    /// Time a keep-alive connection may sit without a request
    pub idle_timeout: u64,
}

impl PerformanceConfig {
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout)
    }

    pub const fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout)
    }

    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout)
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Access log file path (optional, stdout if not set)
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    pub error_log_file: Option<String>,
}

/// Path containment configuration
#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct SecurityConfig {
    /// Compare candidate paths to the root component by component instead of
    /// by string prefix
    #[serde(default)]
    pub strict_containment: bool,
}
