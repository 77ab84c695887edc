/// Configuration management for Publishing Service
///
/// Everything is read from environment variables (`.env` is loaded by the
/// binary before `Config::from_env`).
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::services::ListingLimits;

const DEV_JWT_SECRET: &str = "publishing-dev-secret";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub cors: CorsConfig,
    pub database: DatabaseConfig,
    pub storage: StorageBackend,
    pub auth: AuthConfig,
    pub listing: ListingConfig,
    pub jobs: JobsConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

impl CorsConfig {
    pub fn origins(&self) -> impl Iterator<Item = &str> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Apply the bundled migrations at startup
    pub run_migrations: bool,
}

/// Where posts, authors and likes live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    /// Process-local store; data is lost on restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown STORAGE_BACKEND '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret for bearer tokens
    #[serde(skip_serializing)]
    pub jwt_secret: String,
}

/// Listing page sizes
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListingConfig {
    pub page_size: u32,
    pub max_page_size: u32,
    pub trending_limit: u32,
}

impl From<ListingConfig> for ListingLimits {
    fn from(config: ListingConfig) -> Self {
        ListingLimits {
            page_size: config.page_size,
            max_page_size: config.max_page_size,
            trending_limit: config.trending_limit,
        }
    }
}

/// Background jobs
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Seconds between like reconciliation sweeps; 0 disables the job
    pub like_reconcile_interval_secs: u64,
    pub like_reconcile_batch_size: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_env = lookup("APP_ENV").unwrap_or_else(|| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        let allowed_origins = match lookup("CORS_ALLOWED_ORIGINS") {
            Some(value) => value,
            None if production => {
                return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
            }
            None => "http://localhost:3000".to_string(),
        };
        if production && allowed_origins.trim() == "*" {
            return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
        }

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.trim().is_empty()) {
            Some(secret) => secret,
            None if production => return Err("JWT_SECRET must be set in production".to_string()),
            None => DEV_JWT_SECRET.to_string(),
        };

        let listing = ListingConfig {
            page_size: parse_or(&lookup, "LISTING_PAGE_SIZE", 5)?,
            max_page_size: parse_or(&lookup, "LISTING_MAX_PAGE_SIZE", 50)?,
            trending_limit: parse_or(&lookup, "TRENDING_LIMIT", 5)?,
        };
        if listing.page_size == 0 || listing.page_size > listing.max_page_size {
            return Err(format!(
                "LISTING_PAGE_SIZE must be between 1 and LISTING_MAX_PAGE_SIZE ({})",
                listing.max_page_size
            ));
        }

        Ok(Config {
            app: AppConfig {
                env: app_env,
                host: lookup("PUBLISHING_SERVICE_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "PUBLISHING_SERVICE_PORT", 8082)?,
            },
            cors: CorsConfig { allowed_origins },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL")
                    .unwrap_or_else(|| "postgresql://localhost/publishing".to_string()),
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
                run_migrations: parse_or(&lookup, "DATABASE_RUN_MIGRATIONS", false)?,
            },
            storage: parse_or(&lookup, "STORAGE_BACKEND", StorageBackend::Postgres)?,
            auth: AuthConfig { jwt_secret },
            listing,
            jobs: JobsConfig {
                like_reconcile_interval_secs: parse_or(
                    &lookup,
                    "LIKE_RECONCILE_INTERVAL_SECS",
                    300,
                )?,
                like_reconcile_batch_size: parse_or(&lookup, "LIKE_RECONCILE_BATCH_SIZE", 500)?,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, String>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn development_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.app.port, 8082);
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.listing.page_size, 5);
        assert_eq!(config.listing.max_page_size, 50);
        assert_eq!(config.listing.trending_limit, 5);
        assert_eq!(config.jobs.like_reconcile_interval_secs, 300);
        assert!(!config.database.run_migrations);
        assert_eq!(config.auth.jwt_secret, DEV_JWT_SECRET);
    }

    #[test]
    fn production_requires_cors_and_secret() {
        let err = load(&[("APP_ENV", "production"), ("JWT_SECRET", "s")]).unwrap_err();
        assert!(err.contains("CORS_ALLOWED_ORIGINS"));

        let err = load(&[
            ("APP_ENV", "production"),
            ("CORS_ALLOWED_ORIGINS", "*"),
            ("JWT_SECRET", "s"),
        ])
        .unwrap_err();
        assert!(err.contains("'*'"));

        let err = load(&[
            ("APP_ENV", "production"),
            ("CORS_ALLOWED_ORIGINS", "https://blog.example.com"),
        ])
        .unwrap_err();
        assert!(err.contains("JWT_SECRET"));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = load(&[("PUBLISHING_SERVICE_PORT", "eighty")]).unwrap_err();
        assert!(err.contains("PUBLISHING_SERVICE_PORT"));
    }

    #[test]
    fn storage_backend_and_origins_parse() {
        let config = load(&[
            ("STORAGE_BACKEND", "memory"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
        ])
        .unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(
            config.cors.origins().collect::<Vec<_>>(),
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn page_size_must_fit_the_maximum() {
        let err = load(&[("LISTING_PAGE_SIZE", "80")]).unwrap_err();
        assert!(err.contains("LISTING_PAGE_SIZE"));
    }
}
