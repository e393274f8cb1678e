use std::env;
use std::time::Duration;

use crate::shared::constants::{
    DEFAULT_FORBIDDEN_EXTENSIONS, DEFAULT_MAX_UPLOAD_SIZE, DEFAULT_SHARE_DAYS,
    DEFAULT_SHARE_MAX_DAYS, DEFAULT_SHARE_MIN_DAYS, DEFAULT_UPLOAD_PREFIX,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub swagger: SwaggerConfig,
    pub minio: MinIOConfig,
    pub transfer: TransferConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

/// Where file records live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStoreKind {
    Postgres,
    /// Process-local store, lost on restart. Development only.
    Memory,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub store: RecordStoreKind,
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub issuer: String,
    pub audience: String,
    pub jwks_url: String,
    pub jwks_cache_ttl: Duration,
    pub jwt_leeway: Duration,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

/// MinIO/S3 storage configuration for direct transfers
#[derive(Debug, Clone)]
pub struct MinIOConfig {
    /// MinIO/S3 endpoint URL used by this service
    pub endpoint: String,
    /// Endpoint URL reachable by clients; presigned URLs are signed for it
    pub public_endpoint: String,
    /// Access key for authentication
    pub access_key: String,
    /// Secret key for authentication
    pub secret_key: String,
    /// Bucket name for storing files
    pub bucket: String,
    /// AWS region (for S3 compatibility)
    pub region: String,
    /// Key prefix for uploaded objects (e.g., "uploads")
    pub upload_prefix: String,
    /// Presigned URL validity in seconds
    pub presigned_url_expiry_secs: u32,
}

/// Sharing policy: who may upload and for how long links stay valid
#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub allow_anonymous_upload: bool,
    pub min_days: i64,
    pub max_days: i64,
    pub default_days: i64,
    pub max_upload_size: i64,
    pub forbidden_extensions: Vec<String>,
    pub upstream_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
            minio: MinIOConfig::from_env()?,
            transfer: TransferConfig::from_env()?,
        })
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = split_list(
            &env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()),
        );

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl RecordStoreKind {
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!(
                "RECORD_STORE must be 'postgres' or 'memory', got '{}'",
                other
            )),
        }
    }
}

impl DatabaseConfig {
    // Default values for database connection pool (conservative defaults for small-medium apps)
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let store =
            RecordStoreKind::parse(&env::var("RECORD_STORE").unwrap_or_else(|_| "postgres".into()))?;

        let url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        if store == RecordStoreKind::Postgres && url.is_none() {
            return Err("DATABASE_URL must be set".to_string());
        }

        Ok(Self {
            store,
            url,
            max_connections: parse_env("DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?,
            min_connections: parse_env("DB_MIN_CONNECTIONS", Self::DEFAULT_MIN_CONNECTIONS)?,
            acquire_timeout_secs: parse_env(
                "DB_ACQUIRE_TIMEOUT_SECS",
                Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            idle_timeout_secs: parse_env("DB_IDLE_TIMEOUT_SECS", Self::DEFAULT_IDLE_TIMEOUT_SECS)?,
            max_lifetime_secs: parse_env("DB_MAX_LIFETIME_SECS", Self::DEFAULT_MAX_LIFETIME_SECS)?,
        })
    }
}

impl AuthConfig {
    // Default values for JWT authentication
    const DEFAULT_JWKS_CACHE_TTL_SECS: u64 = 3600; // 1 hour
    const DEFAULT_JWT_LEEWAY_SECS: u64 = 60; // 1 minute

    pub fn from_env() -> Result<Self, String> {
        let issuer = env::var("AUTH_ISSUER")
            .map_err(|_| "AUTH_ISSUER environment variable is required".to_string())?;

        let audience = env::var("AUTH_AUDIENCE")
            .map_err(|_| "AUTH_AUDIENCE environment variable is required".to_string())?;

        let jwks_url = env::var("AUTH_JWKS_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("{}/jwks", issuer.trim_end_matches('/')));

        let jwks_cache_ttl_secs = parse_env("JWKS_CACHE_TTL", Self::DEFAULT_JWKS_CACHE_TTL_SECS)?;
        let jwt_leeway_secs = parse_env("JWT_LEEWAY", Self::DEFAULT_JWT_LEEWAY_SECS)?;

        Ok(Self {
            issuer,
            audience,
            jwks_url,
            jwks_cache_ttl: Duration::from_secs(jwks_cache_ttl_secs),
            jwt_leeway: Duration::from_secs(jwt_leeway_secs),
        })
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Datashare API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "Token-based file sharing with presigned transfers".to_string());

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

impl MinIOConfig {
    const DEFAULT_PRESIGNED_URL_EXPIRY_SECS: u32 = 600; // 10 minutes

    pub fn from_env() -> Result<Self, String> {
        let endpoint =
            env::var("MINIO_ENDPOINT").unwrap_or_else(|_| "http://localhost:9000".to_string());

        // Public endpoint defaults to the main endpoint if not specified
        let public_endpoint =
            env::var("MINIO_PUBLIC_ENDPOINT").unwrap_or_else(|_| endpoint.clone());

        let access_key = env::var("MINIO_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".to_string());
        let secret_key = env::var("MINIO_SECRET_KEY").unwrap_or_else(|_| "minioadmin".to_string());
        let bucket = env::var("MINIO_BUCKET").unwrap_or_else(|_| "datashare".to_string());
        let region = env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        let upload_prefix = env::var("MINIO_UPLOAD_PREFIX")
            .unwrap_or_else(|_| DEFAULT_UPLOAD_PREFIX.to_string())
            .trim_matches('/')
            .to_string();

        let presigned_url_expiry_secs = parse_env(
            "MINIO_PRESIGNED_URL_EXPIRY_SECS",
            Self::DEFAULT_PRESIGNED_URL_EXPIRY_SECS,
        )?;

        Ok(Self {
            endpoint,
            public_endpoint,
            access_key,
            secret_key,
            bucket,
            region,
            upload_prefix,
            presigned_url_expiry_secs,
        })
    }
}

impl TransferConfig {
    const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

    pub fn from_env() -> Result<Self, String> {
        let allow_anonymous_upload = env::var("ALLOW_ANONYMOUS_UPLOAD")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let forbidden_extensions = env::var("FORBIDDEN_EXTENSIONS").ok().map(|list| {
            split_list(&list)
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect()
        });

        let defaults = Self::default();
        let config = Self {
            allow_anonymous_upload,
            min_days: parse_env("SHARE_MIN_DAYS", defaults.min_days)?,
            max_days: parse_env("SHARE_MAX_DAYS", defaults.max_days)?,
            default_days: parse_env("SHARE_DEFAULT_DAYS", defaults.default_days)?,
            max_upload_size: parse_env("MAX_UPLOAD_SIZE", defaults.max_upload_size)?,
            forbidden_extensions: forbidden_extensions.unwrap_or(defaults.forbidden_extensions),
            upstream_timeout: parse_env("UPSTREAM_TIMEOUT_SECS", defaults.upstream_timeout.as_secs())
                .map(Duration::from_secs)?,
        };

        if config.max_upload_size < 0 {
            return Err("MAX_UPLOAD_SIZE must not be negative".to_string());
        }

        Ok(config)
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            allow_anonymous_upload: false,
            min_days: DEFAULT_SHARE_MIN_DAYS,
            max_days: DEFAULT_SHARE_MAX_DAYS,
            default_days: DEFAULT_SHARE_DAYS,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            forbidden_extensions: DEFAULT_FORBIDDEN_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            upstream_timeout: Duration::from_secs(Self::DEFAULT_UPSTREAM_TIMEOUT_SECS),
        }
    }
}

/// Read `name` from the environment, falling back to `default` when unset
fn parse_env<T>(name: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid number", name)),
        Err(_) => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
