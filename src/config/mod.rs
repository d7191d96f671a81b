use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Process configuration. Built once at startup by [`AppConfig::from_env`] and
/// handed to the router inside `AppState`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub query: QueryConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub uploads: UploadConfig,
    pub geocoder: GeocoderConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub default_limit: u64,
    pub max_limit: Option<u64>,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_rate_limiting: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,
    /// Distinct client IPs tracked at once.
    pub rate_limit_max_entries: usize,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub jwt_cookie_expire_days: i64,
    pub bcrypt_cost: u32,
    pub reset_token_ttl_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_file_upload: usize,
    pub file_upload_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub relay_url: Option<String>,
    pub from: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment, Environment::Production)
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Query overrides
        if let Ok(v) = env::var("QUERY_DEFAULT_LIMIT") {
            self.query.default_limit = v.parse().unwrap_or(self.query.default_limit);
        }
        if let Ok(v) = env::var("QUERY_MAX_LIMIT") {
            self.query.max_limit = v.parse().ok();
        }
        if let Ok(v) = env::var("QUERY_DEBUG_LOGGING") {
            self.query.debug_logging = v.parse().unwrap_or(self.query.debug_logging);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_RATE_LIMITING") {
            self.api.enable_rate_limiting = v.parse().unwrap_or(self.api.enable_rate_limiting);
        }
        if let Ok(v) = env::var("API_RATE_LIMIT_REQUESTS") {
            self.api.rate_limit_requests = v.parse().unwrap_or(self.api.rate_limit_requests);
        }
        if let Ok(v) = env::var("API_RATE_LIMIT_WINDOW_SECS") {
            self.api.rate_limit_window_secs = v.parse().unwrap_or(self.api.rate_limit_window_secs);
        }
        if let Ok(v) = env::var("API_RATE_LIMIT_MAX_ENTRIES") {
            self.api.rate_limit_max_entries = v.parse().unwrap_or(self.api.rate_limit_max_entries);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRE_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("JWT_COOKIE_EXPIRE_DAYS") {
            self.security.jwt_cookie_expire_days = v.parse().unwrap_or(self.security.jwt_cookie_expire_days);
        }
        if let Ok(v) = env::var("BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }

        // Upload overrides
        if let Ok(v) = env::var("MAX_FILE_UPLOAD") {
            self.uploads.max_file_upload = v.parse().unwrap_or(self.uploads.max_file_upload);
        }
        if let Ok(v) = env::var("FILE_UPLOAD_PATH") {
            self.uploads.file_upload_path = PathBuf::from(v);
        }

        // Collaborators
        if let Ok(v) = env::var("GEOCODER_API_KEY") {
            self.geocoder.api_key = Some(v).filter(|k| !k.is_empty());
        }
        if let Ok(v) = env::var("GEOCODER_URL") {
            self.geocoder.endpoint = v;
        }
        if let Ok(v) = env::var("MAIL_RELAY_URL") {
            self.mail.relay_url = Some(v).filter(|u| !u.is_empty());
        }
        if let Ok(v) = env::var("MAIL_FROM") {
            self.mail.from = v;
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 5000 },
            query: QueryConfig {
                default_limit: 100,
                max_limit: Some(1000),
                debug_logging: true,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                enable_rate_limiting: false,
                rate_limit_requests: 1000,
                rate_limit_window_secs: 600,
                rate_limit_max_entries: 4_096,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec![],
                jwt_secret: "development-secret-change-me".to_string(),
                jwt_expiry_hours: 24 * 30,
                jwt_cookie_expire_days: 30,
                bcrypt_cost: 10,
                reset_token_ttl_minutes: 10,
            },
            uploads: UploadConfig {
                max_file_upload: 1_000_000,
                file_upload_path: PathBuf::from("./public/uploads"),
            },
            geocoder: GeocoderConfig {
                api_key: None,
                endpoint: "https://www.mapquestapi.com/geocoding/v1/address".to_string(),
            },
            mail: MailConfig {
                relay_url: None,
                from: "DevCamper <noreply@devcamper.io>".to_string(),
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.query = QueryConfig {
            default_limit: 100,
            max_limit: Some(500),
            debug_logging: false,
        };
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.api = ApiConfig {
            enable_rate_limiting: true,
            rate_limit_requests: 100,
            rate_limit_window_secs: 600,
            rate_limit_max_entries: 4_096,
            max_request_size_bytes: 5 * 1024 * 1024, // 5MB
        };
        config.security.jwt_secret = String::new();
        config.security.cors_origins = vec!["https://staging.example.com".to_string()];
        config.security.bcrypt_cost = 12;
        config
    }

    fn production() -> Self {
        let mut config = Self::staging();
        config.environment = Environment::Production;
        config.query.max_limit = Some(100);
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.api.max_request_size_bytes = 2 * 1024 * 1024; // 2MB
        config.security.cors_origins = vec!["https://app.example.com".to_string()];
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.query.default_limit, 100);
        assert!(!config.api.enable_rate_limiting);
        assert!(!config.is_production());
        assert!(!config.security.jwt_secret.is_empty());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.is_production());
        assert_eq!(config.query.max_limit, Some(100));
        assert!(config.api.enable_rate_limiting);
        assert_eq!(config.api.rate_limit_requests, 100);
        assert_eq!(config.api.rate_limit_window_secs, 600);
        // secret must come from the environment outside development
        assert!(config.security.jwt_secret.is_empty());
    }
}
