//! Configuration management
//!
//! Handles loading and validating pool and load-driver configuration from
//! TOML files.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub pool: PoolConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub workload: WorkloadConfig,
}

/// Elastic pool configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PoolConfig {
    /// Items held by each buffer
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    /// Ceiling on the number of buffers
    #[serde(default = "default_max_buffer_count")]
    pub max_buffer_count: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            max_buffer_count: default_max_buffer_count(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Enable the Prometheus endpoint
    #[serde(default)]
    pub enabled: bool,
    /// Metrics server bind address
    #[serde(default = "default_metrics_addr")]
    pub bind_addr: SocketAddr,
    /// How often pool stats are pushed to the exporter
    #[serde(default = "default_publish_interval")]
    pub publish_interval_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_addr: default_metrics_addr(),
            publish_interval_ms: default_publish_interval(),
        }
    }
}

/// Synthetic producer/consumer load
#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadConfig {
    /// Number of producer threads (0 = auto)
    #[serde(default)]
    pub producers: usize,
    /// Number of consumer threads
    #[serde(default = "default_consumers")]
    pub consumers: usize,
    /// Items put by each producer
    #[serde(default = "default_items_per_producer")]
    pub items_per_producer: usize,
    /// Size of each payload in bytes
    #[serde(default = "default_payload_bytes")]
    pub payload_bytes: usize,
}

impl WorkloadConfig {
    /// Get effective producer count (auto-detect if 0)
    pub fn effective_producers(&self) -> usize {
        if self.producers == 0 {
            num_cpus::get()
        } else {
            self.producers
        }
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            producers: 0,
            consumers: default_consumers(),
            items_per_producer: default_items_per_producer(),
            payload_bytes: default_payload_bytes(),
        }
    }
}

// Default value functions
fn default_buffer_capacity() -> usize { 1024 }
fn default_max_buffer_count() -> usize { 16 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "pretty".to_string() }
fn default_metrics_addr() -> SocketAddr { SocketAddr::from(([127, 0, 0, 1], 9090)) }
fn default_publish_interval() -> u64 { 1000 }
fn default_consumers() -> usize { 2 }
fn default_items_per_producer() -> usize { 100_000 }
fn default_payload_bytes() -> usize { 64 }

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .with_context(|| "Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.pool.buffer_capacity == 0 {
            anyhow::bail!("buffer_capacity must be > 0");
        }
        if self.pool.max_buffer_count == 0 {
            anyhow::bail!("max_buffer_count must be > 0");
        }
        if self.workload.consumers == 0 {
            anyhow::bail!("consumers must be > 0");
        }
        if self.metrics.publish_interval_ms == 0 {
            anyhow::bail!("publish_interval_ms must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let config = Config::parse("[pool]\n").unwrap();
        assert_eq!(config.pool, PoolConfig::default());
        assert_eq!(config.logging.level, "info");
        assert!(!config.metrics.enabled);
        assert!(config.workload.effective_producers() > 0);
    }

    #[test]
    fn test_parse_full() {
        let config = Config::parse(
            r#"
            [pool]
            buffer_capacity = 8
            max_buffer_count = 4

            [logging]
            level = "debug"
            format = "json"

            [metrics]
            enabled = true
            bind_addr = "0.0.0.0:9100"

            [workload]
            producers = 3
            consumers = 1
            items_per_producer = 10
            payload_bytes = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.pool.buffer_capacity, 8);
        assert_eq!(config.pool.max_buffer_count, 4);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.metrics.bind_addr.port(), 9100);
        assert_eq!(config.workload.effective_producers(), 3);
    }

    #[test]
    fn test_reject_zero_capacity() {
        let err = Config::parse("[pool]\nbuffer_capacity = 0\n").unwrap_err();
        assert!(err.to_string().contains("buffer_capacity"));

        assert!(Config::parse("[pool]\nmax_buffer_count = 0\n").is_err());
    }
}
