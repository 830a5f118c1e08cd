//! Application configuration loaded from the environment.

use std::env;

use crate::constants::{DEFAULT_MAX_FILE_SIZE, DEFAULT_UPLOAD_DIR};
use crate::storage_types::StorageBackend;

const DEFAULT_PORT: u16 = 5000;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct AppConfig {
    server_port: u16,
    environment: String,
    cors_origins: Vec<String>,
    database_url: Option<String>,
    db_max_connections: u32,
    db_timeout_seconds: u64,
    run_migrations: bool,
    jwt_secret: String,
    max_file_size_bytes: usize,
    upload_dir: String,
    storage_backend: StorageBackend,
}

impl AppConfig {
    /// Load configuration from process environment (and `.env` if present).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins_str = lookup("CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        if is_production_name(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port = match lookup("PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => DEFAULT_PORT,
        };

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LEN
            ));
        }

        let max_file_size_bytes = match lookup("MAX_FILE_SIZE") {
            Some(raw) => {
                let parsed: usize = raw
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("MAX_FILE_SIZE must be a size in bytes"))?;
                if parsed == 0 {
                    return Err(anyhow::anyhow!("MAX_FILE_SIZE must be greater than zero"));
                }
                parsed
            }
            None => DEFAULT_MAX_FILE_SIZE,
        };

        let upload_dir = lookup("UPLOAD_DIR")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_string());

        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => StorageBackend::Local,
        };

        Ok(AppConfig {
            server_port,
            environment,
            cors_origins,
            database_url: lookup("DATABASE_URL").filter(|s| !s.trim().is_empty()),
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: lookup("DB_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            run_migrations: lookup("RUN_MIGRATIONS")
                .map(|s| s.to_lowercase())
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
            jwt_secret,
            max_file_size_bytes,
            upload_dir,
            storage_backend,
        })
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn is_production(&self) -> bool {
        is_production_name(&self.environment)
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.cors_origins
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.db_timeout_seconds
    }

    pub fn run_migrations(&self) -> bool {
        self.run_migrations
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_bytes
    }

    pub fn upload_dir(&self) -> &str {
        &self.upload_dir
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage_backend
    }
}

fn is_production_name(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}
