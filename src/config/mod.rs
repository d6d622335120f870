use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub contracts: ContractConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub store_backend: StoreBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
    pub enable_query_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub max_request_size_bytes: usize,
    pub listings_default_limit: i32,
    pub max_limit: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub min_password_length: usize,
    /// bcrypt work factor for stored password hashes
    pub password_hash_cost: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Remaining days at or below which an active lease is flagged ending_soon.
    pub ending_soon_days: i64,
    pub default_notice_period_days: i32,
    pub default_lease_months: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub url: Option<String>,
    #[serde(skip_serializing)]
    pub service_key: Option<String>,
    pub bucket: String,
    pub max_image_bytes: usize,
    pub max_images_per_upload: usize,
}

pub const DEFAULT_JWT_SECRET: &str = "easylease-secret-key-change-in-production";

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").or_else(|_| env::var("NODE_ENV")).as_deref() {
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

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("STORE_BACKEND") {
            self.server.store_backend = match v.to_ascii_lowercase().as_str() {
                "memory" => StoreBackend::Memory,
                "postgres" | "postgresql" => StoreBackend::Postgres,
                _ => self.server.store_backend,
            };
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }

        // API overrides
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("LISTINGS_DEFAULT_LIMIT") {
            self.api.listings_default_limit = v.parse().unwrap_or(self.api.listings_default_limit);
        }
        if let Ok(v) = env::var("API_MAX_LIMIT") {
            self.api.max_limit = v.parse().ok();
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            if !v.is_empty() {
                self.security.jwt_secret = v;
            }
        }
        if let Ok(v) = env::var("PASSWORD_HASH_COST") {
            self.security.password_hash_cost = v.parse().unwrap_or(self.security.password_hash_cost);
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        // Contract overrides
        if let Ok(v) = env::var("CONTRACT_ENDING_SOON_DAYS") {
            self.contracts.ending_soon_days = v.parse().unwrap_or(self.contracts.ending_soon_days);
        }

        // Storage overrides
        if let Ok(v) = env::var("SUPABASE_URL") {
            self.storage.url = Some(v.trim_end_matches('/').to_string());
        }
        if let Ok(v) = env::var("SUPABASE_SERVICE_ROLE_KEY") {
            self.storage.service_key = Some(v);
        }
        if let Ok(v) = env::var("STORAGE_BUCKET") {
            self.storage.bucket = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 4000,
                store_backend: StoreBackend::Memory,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
                enable_query_logging: true,
            },
            api: ApiConfig {
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
                listings_default_limit: 50,
                max_limit: Some(1000),
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                jwt_secret: DEFAULT_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                min_password_length: 6,
                password_hash_cost: 10,
            },
            contracts: ContractConfig::default(),
            storage: StorageConfig::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 4000,
                store_backend: StoreBackend::Postgres,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
                enable_query_logging: true,
            },
            api: ApiConfig {
                max_request_size_bytes: 10 * 1024 * 1024,
                listings_default_limit: 50,
                max_limit: Some(500),
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.easylease.app".to_string()],
                jwt_secret: DEFAULT_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24 * 7,
                min_password_length: 6,
                password_hash_cost: 10,
            },
            contracts: ContractConfig::default(),
            storage: StorageConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 4000,
                store_backend: StoreBackend::Postgres,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: false,
                enable_query_logging: false,
            },
            api: ApiConfig {
                max_request_size_bytes: 10 * 1024 * 1024,
                listings_default_limit: 50,
                max_limit: Some(100),
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://easylease.app".to_string()],
                // Must be provided through JWT_SECRET
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 7,
                min_password_length: 6,
                password_hash_cost: 10,
            },
            contracts: ContractConfig::default(),
            storage: StorageConfig::default(),
        }
    }

    /// Configuration used by tests: in-memory store, fixed secret, no CORS restrictions.
    pub fn for_tests() -> Self {
        let mut config = Self::development();
        config.server.store_backend = StoreBackend::Memory;
        config.security.jwt_secret = "test-secret".to_string();
        config.security.cors_origins = vec![];
        config.security.password_hash_cost = 4;
        config
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            ending_soon_days: 30,
            default_notice_period_days: 14,
            default_lease_months: 6,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: None,
            service_key: None,
            bucket: "easylease-storage".to_string(),
            max_image_bytes: 5 * 1024 * 1024, // 5MB
            max_images_per_upload: 10,
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.store_backend, StoreBackend::Memory);
        assert_eq!(config.security.jwt_expiry_hours, 168);
        assert_eq!(config.contracts.ending_soon_days, 30);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.server.store_backend, StoreBackend::Postgres);
        assert!(config.security.jwt_secret.is_empty());
        assert!(!config.database.run_migrations);
    }

    #[test]
    fn test_storage_defaults() {
        let config = AppConfig::development();
        assert_eq!(config.storage.bucket, "easylease-storage");
        assert_eq!(config.storage.max_image_bytes, 5 * 1024 * 1024);
        assert_eq!(config.contracts.default_notice_period_days, 14);
    }
}
