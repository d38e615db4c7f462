//! Configuration for Herald

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the configuration file location
pub const CONFIG_PATH_ENV: &str = "HERALD_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Messaging gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Facebook/Instagram Graph API configuration
    #[serde(default)]
    pub meta: MetaConfig,

    /// Dispatch engine configuration
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Hostname
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            bind_address: default_bind_address(),
        }
    }
}

fn default_hostname() -> String {
    "localhost".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database backend: "postgres"
    #[serde(default = "default_db_backend")]
    pub backend: String,

    /// Database URL
    pub url: Option<String>,

    /// Maximum connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_db_backend() -> String {
    "postgres".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    2
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API port
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_api_port() -> u16 {
    8080
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
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

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Messaging gateway (WAHA) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL used when an identity has no URL of its own
    #[serde(default = "default_gateway_url")]
    pub url: String,

    /// Value sent in the X-Api-Key header
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            api_key: None,
            timeout_secs: default_gateway_timeout(),
        }
    }
}

fn default_gateway_url() -> String {
    "http://waha:3000".to_string()
}

fn default_gateway_timeout() -> u64 {
    10
}

/// Graph API configuration for the Facebook/Instagram side channels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    /// Graph API base URL
    #[serde(default = "default_graph_url")]
    pub graph_url: String,

    /// Graph API version segment, e.g. "v19.0"
    #[serde(default = "default_graph_version")]
    pub api_version: String,

    /// Page or user access token
    pub access_token: Option<String>,

    /// Facebook page to publish feed posts on
    pub facebook_page_id: Option<String>,

    /// Instagram business account to publish media on
    pub instagram_account_id: Option<String>,

    /// Public image attached to Instagram posts (the caption carries the text)
    pub instagram_image_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_graph_timeout")]
    pub timeout_secs: u64,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            graph_url: default_graph_url(),
            api_version: default_graph_version(),
            access_token: None,
            facebook_page_id: None,
            instagram_account_id: None,
            instagram_image_url: None,
            timeout_secs: default_graph_timeout(),
        }
    }
}

fn default_graph_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_graph_version() -> String {
    "v19.0".to_string()
}

fn default_graph_timeout() -> u64 {
    15
}

/// Dispatch engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Lower bound of the pulse rest jitter window (seconds)
    #[serde(default = "default_pulse_rest_min")]
    pub pulse_rest_min_secs: u64,

    /// Upper bound of the pulse rest jitter window (seconds).
    /// Zero disables the window and falls back to the campaign's
    /// `pause_duration_seconds`.
    #[serde(default = "default_pulse_rest_max")]
    pub pulse_rest_max_secs: u64,

    /// Interval of the background reconciliation sweep (seconds)
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pulse_rest_min_secs: default_pulse_rest_min(),
            pulse_rest_max_secs: default_pulse_rest_max(),
            reconcile_interval_secs: default_reconcile_interval(),
        }
    }
}

fn default_pulse_rest_min() -> u64 {
    2
}

fn default_pulse_rest_max() -> u64 {
    5
}

fn default_reconcile_interval() -> u64 {
    60
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `HERALD_CONFIG` or the default locations
    pub fn load() -> crate::Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Self::from_file(Path::new(&path));
        }

        let paths = [
            PathBuf::from("./herald.toml"),
            PathBuf::from("./config.toml"),
            PathBuf::from("/etc/herald/config.toml"),
        ];

        for path in paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(crate::Error::Config(
            "No configuration file found".to_string(),
        ))
    }

    fn validate(&self) -> crate::Result<()> {
        if self.dispatch.pulse_rest_min_secs > self.dispatch.pulse_rest_max_secs
            && self.dispatch.pulse_rest_max_secs != 0
        {
            return Err(crate::Error::Config(format!(
                "dispatch.pulse_rest_min_secs ({}) exceeds pulse_rest_max_secs ({})",
                self.dispatch.pulse_rest_min_secs, self.dispatch.pulse_rest_max_secs
            )));
        }
        if self.dispatch.reconcile_interval_secs == 0 {
            return Err(crate::Error::Config(
                "dispatch.reconcile_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
