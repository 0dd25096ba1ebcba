use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Summed attachment size accepted for one submission (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATABASE_PATH: &str = "award-workflow.db";
const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Deployment stage, read from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(raw: Option<String>) -> Self {
        let Some(raw) = raw else {
            return Self::Development;
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "test" | "ci" => Self::Test,
            "prod" | "production" => Self::Production,
            _ => Self::Development,
        }
    }
}

/// Everything the service and the admin commands need, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub actor_directory: Option<PathBuf>,
}

impl AppConfig {
    /// Reads `.env` (when present) and then the `APP_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            environment: AppEnvironment::parse(setting("APP_ENV")),
            server: ServerConfig::from_env()?,
            telemetry: TelemetryConfig::from_env()?,
            database: DatabaseConfig {
                path: setting("APP_DATABASE_PATH")
                    .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            },
            storage: StorageConfig::from_env()?,
            actor_directory: setting("APP_ACTOR_DIRECTORY").map(PathBuf::from),
        })
    }
}

/// A variable that is set to something other than whitespace.
fn setting(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let port = match setting("APP_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort { value: raw })?,
            None => DEFAULT_PORT,
        };
        Ok(Self {
            host: setting("APP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let host = self.host.trim();
        let ip = if host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            host.parse::<IpAddr>()
                .map_err(|source| ConfigError::InvalidHost {
                    value: self.host.clone(),
                    source,
                })?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

impl TelemetryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            log_level: setting("APP_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            format: setting("APP_LOG_FORMAT")
                .map(|raw| LogFormat::parse(&raw))
                .transpose()?
                .unwrap_or(LogFormat::Compact),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidLogFormat {
                value: raw.to_string(),
            }),
        }
    }
}

/// Location of the SQLite database. `:memory:` selects a private in-memory store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

impl DatabaseConfig {
    pub fn is_in_memory(&self) -> bool {
        self.path.trim() == ":memory:"
    }
}

/// Attachment storage root and upload cap.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub max_upload_bytes: u64,
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let max_upload_bytes = match setting("APP_MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|bytes| *bytes > 0)
                .ok_or(ConfigError::InvalidUploadLimit { value: raw })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };
        Ok(Self {
            upload_dir: PathBuf::from(
                setting("APP_UPLOAD_DIR").unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_string()),
            ),
            max_upload_bytes,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a port number between 0 and 65535 (found '{value}')")]
    InvalidPort { value: String },
    #[error("APP_HOST must be 'localhost' or an IP address (found '{value}')")]
    InvalidHost {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("APP_MAX_UPLOAD_BYTES must be a positive byte count (found '{value}')")]
    InvalidUploadLimit { value: String },
    #[error("APP_LOG_FORMAT must be 'compact' or 'json' (found '{value}')")]
    InvalidLogFormat { value: String },
}
