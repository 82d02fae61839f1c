use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

/// Application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// MessageBird gateway configuration
    pub messagebird: MessageBirdConfig,
    /// Subscriber store configuration
    pub store: StoreConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Server host (default: 0.0.0.0)
    pub host: String,
    /// Server port (default: 8080)
    pub port: u16,
}

/// MessageBird gateway configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MessageBirdConfig {
    /// REST API access key
    pub api_key: String,
    /// Sender shown on outgoing messages (number or alphanumeric id)
    pub originator: String,
    /// API base URL (default: https://rest.messagebird.com)
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    File,
}

/// Subscriber store configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    /// Backend kind (default: memory)
    pub backend: StoreBackend,
    /// JSON file used by the file backend (default: data/subscribers.json)
    pub path: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: json or pretty (default: json)
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for MessageBirdConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            originator: String::new(),
            base_url: "https://rest.messagebird.com".to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: "data/subscribers.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default configuration
            .add_source(Config::try_from(&AppConfig::default())?)
            // Add configuration file based on environment
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local configuration file (gitignored)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (prefixed with SMSLIST__)
            .add_source(Environment::with_prefix("SMSLIST").separator("__"))
            // Plain MessageBird variables win, matching the usual .env setup
            .set_override_option("messagebird.api_key", env::var("MESSAGEBIRD_API_KEY").ok())?
            .set_override_option(
                "messagebird.originator",
                env::var("MESSAGEBIRD_ORIGINATOR").ok(),
            )?
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.messagebird.api_key.trim().is_empty() {
            return Err(ConfigError::Message(
                "messagebird.api_key is required (set MESSAGEBIRD_API_KEY)".into(),
            ));
        }
        if self.messagebird.originator.trim().is_empty() {
            return Err(ConfigError::Message(
                "messagebird.originator is required (set MESSAGEBIRD_ORIGINATOR)".into(),
            ));
        }
        match self.logging.format.as_str() {
            "json" | "pretty" => {}
            other => {
                return Err(ConfigError::Message(format!(
                    "logging.format must be json or pretty, got {other}"
                )));
            }
        }
        if self.store.backend == StoreBackend::File && self.store.path.trim().is_empty() {
            return Err(ConfigError::Message(
                "store.path is required for the file backend".into(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            messagebird: MessageBirdConfig::default(),
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
