//! Application configuration.
//!
//! Loaded once at startup from YAML files and environment variables; the core
//! only ever sees the resulting read-only values (service identity, transport
//! references, consumer tuning).

use serde::Deserialize;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "COMMANDCAST_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "COMMANDCAST";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "COMMANDCAST_LOG";

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service identity stamped on outbound envelopes and used for the
    /// self-origin guard.
    pub service_name: String,
    /// AWS connection settings.
    pub aws: AwsConfig,
    /// SNS broadcast settings.
    pub sns: SnsConfig,
    /// SQS queue settings.
    pub sqs: SqsConfig,
    /// Inbound consumer tuning.
    pub consumer: ConsumerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "commandcast".to_string(),
            aws: AwsConfig::default(),
            sns: SnsConfig::default(),
            sqs: SqsConfig::default(),
            consumer: ConsumerConfig::default(),
        }
    }
}

/// AWS connection settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// AWS region. Uses the default provider chain if not set.
    pub region: Option<String>,
    /// Custom endpoint URL (for LocalStack or testing).
    pub endpoint_url: Option<String>,
}

/// SNS broadcast settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SnsConfig {
    /// Topic ARN commands are broadcast to.
    pub topic_arn: String,
}

/// SQS queue settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SqsConfig {
    /// Queue URL the consumer drains.
    pub queue_url: String,
}

/// Inbound consumer tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Max messages per receive call.
    pub max_messages: i32,
    /// Long-poll wait in seconds.
    pub wait_time_secs: i32,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            max_messages: 10,
            wait_time_secs: 20,
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Sources in order of priority (later overrides earlier):
    /// 1. `config.yaml` in the current directory (if present)
    /// 2. File specified by the `path` argument (if provided)
    /// 3. File specified by `COMMANDCAST_CONFIG` (if set)
    /// 4. Environment variables with the `COMMANDCAST` prefix
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.service_name, "commandcast");
        assert!(config.aws.region.is_none());
        assert_eq!(config.consumer.max_messages, 10);
        assert_eq!(config.consumer.wait_time_secs, 20);
    }
}
