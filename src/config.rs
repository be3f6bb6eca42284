//! Configuration management for Autostelle server

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Which realtime store backend to talk to
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Firebase,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: String,
    /// Database secret or ID token appended as `?auth=` to every request
    pub auth_token: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    pub api_key: String,
    pub endpoint: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_hours: u64,
    /// Seconds before one login attempt is replenished for a peer; 0 disables the limiter
    pub login_per_second: u64,
    pub login_burst: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GateConfig {
    pub login_page: String,
    pub home_page: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    /// How long a terminal outcome stays visible before cleanup
    pub result_display_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    /// When set, logs are also written to a daily rolling file in this directory
    pub directory: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub redis: RedisConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default"))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (with prefix AUTOSTELLE__)
            .add_source(
                Environment::with_prefix("AUTOSTELLE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("store.database_url", env::var("FIREBASE_DATABASE_URL").ok())?
            .set_override_option("store.auth_token", env::var("FIREBASE_DATABASE_SECRET").ok())?
            .set_override_option("identity.api_key", env::var("FIREBASE_API_KEY").ok())?
            .set_override_option("auth.jwt_secret", env::var("JWT_SECRET").ok())?
            .set_override_option("redis.url", env::var("REDIS_URL").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            database_url: "http://127.0.0.1:9000".to_string(),
            auth_token: None,
            request_timeout_secs: 10,
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: "https://identitytoolkit.googleapis.com/v1".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-this-secret-in-production".to_string(),
            jwt_expiration_hours: 24,
            login_per_second: 2,
            login_burst: 5,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            login_page: "login.html".to_string(),
            home_page: "index.html".to_string(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { result_display_ms: 2000 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            directory: None,
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            identity: IdentityConfig::default(),
            auth: AuthConfig::default(),
            gate: GateConfig::default(),
            scan: ScanConfig::default(),
            logging: LoggingConfig::default(),
            redis: RedisConfig::default(),
        }
    }
}
