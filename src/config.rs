use std::time::Duration;

use crate::utils::RetryPolicy;

// ============================================================================
// Configuration - environment variables with development defaults
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// development | staging | production
    pub environment: String,
    pub http_host: String,
    pub http_port: u16,
    /// ScyllaDB contact points
    pub scylla_nodes: Vec<String>,
    pub scylla_keyspace: String,
    pub scylla_replication_factor: u32,
    pub redis_url: String,
    pub cache_ttl: Duration,
    pub kafka_brokers: String,
    pub kafka_topic_orders: String,
    pub kafka_message_timeout: Duration,
    /// Broker send attempts per event, first one included
    pub publish_max_attempts: u32,
    /// Default filter directive when RUST_LOG is unset
    pub log_level: String,
    pub log_format: LogFormat,
    pub request_timeout: Duration,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str, default: &str| lookup(name).filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string());

        let log_format = match var("LOG_FORMAT", "pretty").to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    value: other.to_string(),
                    reason: "expected pretty or json",
                })
            }
        };

        let config = Self {
            environment: var("ENVIRONMENT", "development"),
            http_host: var("HTTP_HOST", "0.0.0.0"),
            http_port: parse("HTTP_PORT", var("HTTP_PORT", "3000"))?,
            scylla_nodes: var("SCYLLA_NODES", "127.0.0.1:9042")
                .split(',')
                .map(str::trim)
                .filter(|node| !node.is_empty())
                .map(String::from)
                .collect(),
            scylla_keyspace: var("SCYLLA_KEYSPACE", "orders_ks"),
            scylla_replication_factor: parse("SCYLLA_REPLICATION_FACTOR", var("SCYLLA_REPLICATION_FACTOR", "1"))?,
            redis_url: var("REDIS_URL", "redis://127.0.0.1:6379"),
            cache_ttl: Duration::from_secs(parse("CACHE_TTL_SECS", var("CACHE_TTL_SECS", "60"))?),
            kafka_brokers: var("KAFKA_BROKERS", "127.0.0.1:9092"),
            kafka_topic_orders: var("KAFKA_TOPIC_ORDERS", "orders.events"),
            kafka_message_timeout: Duration::from_millis(parse(
                "KAFKA_MESSAGE_TIMEOUT_MS",
                var("KAFKA_MESSAGE_TIMEOUT_MS", "5000"),
            )?),
            publish_max_attempts: parse("PUBLISH_MAX_ATTEMPTS", var("PUBLISH_MAX_ATTEMPTS", "3"))?,
            log_level: var("LOG_LEVEL", "info"),
            log_format,
            request_timeout: Duration::from_millis(parse("REQUEST_TIMEOUT_MS", var("REQUEST_TIMEOUT_MS", "30000"))?),
            default_page_size: parse("DEFAULT_PAGE_SIZE", var("DEFAULT_PAGE_SIZE", "10"))?,
            max_page_size: parse("MAX_PAGE_SIZE", var("MAX_PAGE_SIZE", "100"))?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name, value: String, reason| Err(ConfigError::Invalid { name, value, reason });

        if self.scylla_nodes.is_empty() {
            return invalid("SCYLLA_NODES", String::new(), "at least one node is required");
        }
        if !self.scylla_keyspace.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return invalid("SCYLLA_KEYSPACE", self.scylla_keyspace.clone(), "only [A-Za-z0-9_] allowed");
        }
        if self.scylla_replication_factor == 0 {
            return invalid("SCYLLA_REPLICATION_FACTOR", "0".into(), "must be at least 1");
        }
        if self.cache_ttl.is_zero() {
            return invalid("CACHE_TTL_SECS", "0".into(), "must be at least 1");
        }
        if self.publish_max_attempts == 0 {
            return invalid("PUBLISH_MAX_ATTEMPTS", "0".into(), "must be at least 1");
        }
        if self.request_timeout.is_zero() {
            return invalid("REQUEST_TIMEOUT_MS", "0".into(), "must be positive");
        }
        if self.publish_budget() > self.request_timeout {
            return invalid(
                "REQUEST_TIMEOUT_MS",
                self.request_timeout.as_millis().to_string(),
                "shorter than PUBLISH_MAX_ATTEMPTS x KAFKA_MESSAGE_TIMEOUT_MS plus backoff",
            );
        }
        if self.max_page_size == 0 {
            return invalid("MAX_PAGE_SIZE", "0".into(), "must be at least 1");
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return invalid(
                "DEFAULT_PAGE_SIZE",
                self.default_page_size.to_string(),
                "must be between 1 and MAX_PAGE_SIZE",
            );
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_attempts(self.publish_max_attempts)
    }

    /// Worst case for one publish: every attempt times out, plus the backoff between them
    pub fn publish_budget(&self) -> Duration {
        let policy = self.retry_policy();
        let sends = self.kafka_message_timeout * policy.max_attempts;
        let backoff: Duration = (1..policy.max_attempts).map(|attempt| policy.backoff(attempt)).sum();
        sends + backoff
    }

    pub fn http_addr(&self) -> (String, u16) {
        (self.http_host.clone(), self.http_port)
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value,
        reason: "not a valid number",
    })
}
