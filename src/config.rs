/// Configuration management for the MathsApp backend
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub email: Option<EmailConfig>,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Externally reachable base URL, used in signed upload URLs.
    pub public_url: String,
    pub version: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackendConfig,
    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: u64,
}

/// Object storage backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageBackendConfig {
    Disk {
        location: PathBuf,
    },
    S3 {
        bucket: String,
        region: String,
        access_key_id: String,
        secret_access_key: String,
        endpoint: Option<String>,
    },
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Access token lifetime in minutes.
    pub access_ttl_minutes: i64,
    /// Refresh token lifetime in hours.
    pub refresh_ttl_hours: i64,
    /// One-time verification/reset code lifetime in minutes.
    pub code_ttl_minutes: i64,
    /// Signed upload URL lifetime in minutes.
    pub upload_url_ttl_minutes: i64,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// CORS allow-list configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("MATHSAPP_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("MATHSAPP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ApiError::Validation("Invalid port number".to_string()))?;
        let public_url = env::var("MATHSAPP_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", hostname, port));
        let version = env::var("MATHSAPP_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        let db_path: PathBuf = env::var("MATHSAPP_DB_PATH")
            .unwrap_or_else(|_| "./data/mathsapp.sqlite".to_string())
            .into();
        let max_connections = env::var("MATHSAPP_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let backend = if let Ok(bucket) = env::var("MATHSAPP_S3_BUCKET") {
            StorageBackendConfig::S3 {
                bucket,
                region: env::var("MATHSAPP_S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                access_key_id: env::var("MATHSAPP_S3_ACCESS_KEY_ID")
                    .map_err(|_| ApiError::Validation("S3 access key required".to_string()))?,
                secret_access_key: env::var("MATHSAPP_S3_SECRET_ACCESS_KEY")
                    .map_err(|_| ApiError::Validation("S3 secret key required".to_string()))?,
                endpoint: env::var("MATHSAPP_S3_ENDPOINT").ok(),
            }
        } else {
            StorageBackendConfig::Disk {
                location: env::var("MATHSAPP_STORAGE_LOCATION")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./data/objects")),
            }
        };

        let max_upload_bytes = env::var("MATHSAPP_MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let jwt_secret = env::var("MATHSAPP_JWT_SECRET")
            .map_err(|_| ApiError::Validation("JWT secret required".to_string()))?;
        let access_ttl_minutes = env::var("MATHSAPP_ACCESS_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);
        let refresh_ttl_hours = env::var("MATHSAPP_REFRESH_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(168);
        let code_ttl_minutes = env::var("MATHSAPP_CODE_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);
        let upload_url_ttl_minutes = env::var("MATHSAPP_UPLOAD_URL_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(15);

        let email = if let Ok(smtp_url) = env::var("MATHSAPP_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("MATHSAPP_EMAIL_FROM")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
            })
        } else {
            None
        };

        let allowed_origins = env::var("MATHSAPP_CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://localhost:3001".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
                version,
            },
            database: DatabaseConfig {
                path: db_path,
                max_connections,
            },
            storage: StorageConfig {
                backend,
                max_upload_bytes,
            },
            auth: AuthConfig {
                jwt_secret,
                access_ttl_minutes,
                refresh_ttl_hours,
                code_ttl_minutes,
                upload_url_ttl_minutes,
            },
            email,
            cors: CorsConfig { allowed_origins },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ApiError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.auth.jwt_secret.len() < 32 {
            return Err(ApiError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.auth.code_ttl_minutes <= 0 {
            return Err(ApiError::Validation(
                "Code TTL must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 3000,
                public_url: "http://localhost:3000".to_string(),
                version: "0.1.0".to_string(),
            },
            database: DatabaseConfig {
                path: PathBuf::from(":memory:"),
                max_connections: 5,
            },
            storage: StorageConfig {
                backend: StorageBackendConfig::Disk {
                    location: PathBuf::from("./data/objects"),
                },
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            auth: AuthConfig {
                jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
                access_ttl_minutes: 60,
                refresh_ttl_hours: 168,
                code_ttl_minutes: 10,
                upload_url_ttl_minutes: 15,
            },
            email: None,
            cors: CorsConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    #[test]
    fn test_validate_accepts_sane_config() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut config = test_config();
        config.auth.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }
}
