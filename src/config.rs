use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Database URL. Nodes are kept in memory when unset.
    pub db_url: Option<String>,

    /// Pending frames a session may hold before the hub evicts it
    #[serde(default = "default_queue_capacity")]
    pub session_queue_capacity: usize,

    /// Pending commands the hub control loop may hold
    #[serde(default = "default_queue_capacity")]
    pub hub_queue_capacity: usize,

    /// Seconds without any inbound frame before a session is dropped
    #[serde(default = "default_pong_wait_secs")]
    pub pong_wait_secs: u64,

    /// Seconds allowed for a single outbound flush
    #[serde(default = "default_write_wait_secs")]
    pub write_wait_secs: u64,

    /// Largest inbound message accepted, in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        // Load from environment variables using envy
        let config = envy::from_env::<Config>().map_err(ConfigError::EnvError)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject timings the session keepalive cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pong_wait_secs < 2 {
            return Err(ConfigError::Invalid(format!(
                "PONG_WAIT_SECS must be at least 2, got {}",
                self.pong_wait_secs
            )));
        }
        if self.write_wait_secs < 1 {
            return Err(ConfigError::Invalid("WRITE_WAIT_SECS must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    pub fn pong_wait(&self) -> Duration {
        Duration::from_secs(self.pong_wait_secs)
    }

    /// Keepalive period, kept below the read deadline so an idle peer still
    /// refreshes it in time.
    pub fn ping_period(&self) -> Duration {
        self.pong_wait() * 9 / 10
    }

    pub fn write_wait(&self) -> Duration {
        Duration::from_secs(self.write_wait_secs)
    }

    /// Parsed CORS origins, empty when unset
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            db_url: None,
            session_queue_capacity: default_queue_capacity(),
            hub_queue_capacity: default_queue_capacity(),
            pong_wait_secs: default_pong_wait_secs(),
            write_wait_secs: default_write_wait_secs(),
            max_message_size: default_max_message_size(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(envy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_queue_capacity() -> usize {
    256
}

fn default_pong_wait_secs() -> u64 {
    60
}

fn default_write_wait_secs() -> u64 {
    10
}

fn default_max_message_size() -> usize {
    512 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envy_applies_defaults() {
        let vars = vec![
            ("PORT".to_string(), "9001".to_string()),
            ("CORS_ORIGINS".to_string(), "http://a.test, http://b.test".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.port, 9001);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.session_queue_capacity, 256);
        assert_eq!(config.cors_origin_list(), vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn ping_period_is_shorter_than_read_deadline() {
        let config = Config::default();
        assert_eq!(config.pong_wait(), Duration::from_secs(60));
        assert_eq!(config.ping_period(), Duration::from_secs(54));
        assert!(config.ping_period() < config.pong_wait());
    }

    #[test]
    fn validate_rejects_short_deadlines() {
        assert!(Config::default().validate().is_ok());

        for pong_wait_secs in [0, 1] {
            let config = Config { pong_wait_secs, ..Config::default() };
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }

        let config = Config { write_wait_secs: 0, ..Config::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = Config { pong_wait_secs: 2, write_wait_secs: 1, ..Config::default() };
        assert!(config.validate().is_ok());
        assert!(config.ping_period() < config.pong_wait());
    }

    #[test]
    fn rejects_malformed_numbers() {
        let vars = vec![("PORT".to_string(), "not-a-port".to_string())];
        assert!(envy::from_iter::<_, Config>(vars).is_err());
    }
}
