use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub portal: PortalConfig,
    pub email: EmailConfig,
    pub storage: StorageConfig,
    pub playlist: PlaylistConfig,
    pub logging: LoggingConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_request_size: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub mongodb_url: String,
    pub database_name: String,
    pub connection_timeout_seconds: u64,
}

/// Portal-level knobs: the static API key guarding `/api/v1`, plus listing
/// limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    pub api_key: String,
    pub max_list_size: i64,
    pub dashboard_activity_limit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_address: String,
    pub from_name: String,
    /// Sends are skipped (and logged) when disabled.
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub upload_url: String,
    pub api_token: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistConfig {
    pub api_url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub metrics_enabled: bool,
    pub prometheus_namespace: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // Start with default values
            .add_source(File::with_name("config/default").required(false))
            // Add environment-specific config
            .add_source(
                File::with_name(&format!(
                    "config/{}",
                    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into())
                ))
                .required(false),
            )
            // Add local config (gitignored)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with ABPORTAL prefix
            .add_source(Environment::with_prefix("ABPORTAL").separator("__"));

        config.build()?.try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                max_request_size: 16 * 1024 * 1024, // 16MB
                timeout_seconds: 30,
            },
            database: DatabaseConfig {
                mongodb_url: "mongodb://localhost:27017".to_string(),
                database_name: "abportal".to_string(),
                connection_timeout_seconds: 30,
            },
            portal: PortalConfig {
                api_key: "development-key".to_string(),
                max_list_size: 500,
                dashboard_activity_limit: 10,
            },
            email: EmailConfig {
                smtp_host: "localhost".to_string(),
                smtp_port: 587,
                smtp_username: "abportal".to_string(),
                smtp_password: "password".to_string(),
                from_address: "noreply@abpartners.example".to_string(),
                from_name: "AB Partner Portal".to_string(),
                enabled: false,
            },
            storage: StorageConfig {
                upload_url: "http://localhost:9000/uploads".to_string(),
                api_token: String::new(),
                timeout_seconds: 30,
            },
            playlist: PlaylistConfig {
                api_url: "https://playlists.example/api".to_string(),
                api_key: String::new(),
                timeout_seconds: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
                file_path: None,
            },
            monitoring: MonitoringConfig {
                metrics_enabled: true,
                prometheus_namespace: "abportal".to_string(),
            },
        }
    }
}
