use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use rolegraph_application::PermissionCheckerConfig;
use rolegraph_core::AppError;
use rolegraph_domain::PermissionRegistry;
use tracing_subscriber::EnvFilter;

/// Storage adapter selected at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres { database_url: String },
}

/// Permission cache adapter selected at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Redis { redis_url: String },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub api_host: String,
    pub api_port: u16,
    pub storage: StorageBackend,
    pub cache: CacheBackend,
    pub checker: PermissionCheckerConfig,
    pub registry_path: Option<String>,
    pub admin_token: String,
    pub cors_allowed_origin: Option<String>,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3002);

        let storage = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "memory".to_owned())
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "postgres" => StorageBackend::Postgres {
                database_url: required_non_empty_env("DATABASE_URL")?,
            },
            other => {
                return Err(AppError::Validation(format!(
                    "STORAGE_BACKEND must be either 'memory' or 'postgres', got '{other}'"
                )));
            }
        };
        if migrate_only && storage == StorageBackend::Memory {
            return Err(AppError::Validation(
                "migrate requires STORAGE_BACKEND=postgres".to_owned(),
            ));
        }

        let cache = match env::var("PERMISSION_CACHE_BACKEND")
            .unwrap_or_else(|_| "memory".to_owned())
            .as_str()
        {
            "memory" => CacheBackend::Memory,
            "redis" => CacheBackend::Redis {
                redis_url: required_non_empty_env("REDIS_URL")?,
            },
            other => {
                return Err(AppError::Validation(format!(
                    "PERMISSION_CACHE_BACKEND must be either 'memory' or 'redis', got '{other}'"
                )));
            }
        };

        let defaults = PermissionCheckerConfig::default();
        let cache_ttl_seconds =
            parse_env("PERMISSION_CACHE_TTL_SECONDS", defaults.cache_ttl_seconds)?;
        let check_timeout_ms = parse_env(
            "CHECK_TIMEOUT_MS",
            u64::try_from(defaults.check_timeout.as_millis()).unwrap_or(250),
        )?;
        if check_timeout_ms == 0 {
            return Err(AppError::Validation(
                "CHECK_TIMEOUT_MS must be greater than zero".to_owned(),
            ));
        }
        let audit_allowed_checks = env::var("AUDIT_ALLOWED_CHECKS")
            .unwrap_or_else(|_| "false".to_owned())
            .eq_ignore_ascii_case("true");

        let registry_path = env::var("PERMISSION_REGISTRY_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let admin_token = required_env("ADMIN_API_TOKEN")?;
        if admin_token.len() < 32 {
            return Err(AppError::Validation(
                "ADMIN_API_TOKEN must be at least 32 characters".to_owned(),
            ));
        }

        Ok(Self {
            migrate_only,
            api_host,
            api_port,
            storage,
            cache,
            checker: PermissionCheckerConfig {
                check_timeout: Duration::from_millis(check_timeout_ms),
                audit_allowed_checks,
                cache_ttl_seconds,
            },
            registry_path,
            admin_token,
            cors_allowed_origin,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }

    /// Loads the configured catalog, or the built-in institutional one.
    pub fn load_registry(&self) -> Result<PermissionRegistry, AppError> {
        let Some(path) = self.registry_path.as_deref() else {
            return Ok(PermissionRegistry::institutional_default());
        };

        let contents = std::fs::read_to_string(path).map_err(|error| {
            AppError::Validation(format!(
                "failed to read PERMISSION_REGISTRY_PATH '{path}': {error}"
            ))
        })?;
        PermissionRegistry::from_json(contents.as_str())
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn parse_env<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        _ => Ok(default),
    }
}
