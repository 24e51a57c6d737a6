use serde::{Deserialize, Serialize};

/// Structured-logging and metrics configuration. There is no dashboard
/// section here — presentation of metrics to humans is explicitly out of
/// scope (spec §1) — but the logging/metrics plumbing itself is ambient
/// and always carried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Enable metrics collection.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Enable logging.
    #[serde(default = "default_true")]
    pub logging_enabled: bool,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            logging_enabled: true,
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output JSON format.
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Flush interval in seconds.
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: default_flush_interval(),
        }
    }
}

fn default_flush_interval() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_observability_config() {
        let config = ObservabilityConfig::default();
        assert!(config.metrics_enabled);
        assert!(config.logging_enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_observability_config() {
        let toml = r#"
            metrics_enabled = true
            logging_enabled = true

            [logging]
            level = "debug"

            [metrics]
            flush_interval_secs = 5
        "#;

        let config: ObservabilityConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.metrics.flush_interval_secs, 5);
    }
}
