use std::env;
use std::fmt;
use std::time::Duration;

use sqlx::postgres::PgConnectOptions;

/// Database settings loaded from `DB_*` environment variables.
#[derive(Clone)]
pub struct DbConfig {
    pub user: String,
    pub host: String,
    pub name: String,
    pub password: String,
    pub port: u16,
    pub max_connections: u32,
    pub leak_timeout: Duration,
    pub acquire_timeout: Duration,
}

// Hand-written so the password never reaches the logs.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("user", &self.user)
            .field("host", &self.host)
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("max_connections", &self.max_connections)
            .field("leak_timeout", &self.leak_timeout)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

impl DbConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Missing or unparseable
    /// values fall back to the local-development defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            user: lookup("DB_USER").unwrap_or_else(|| "postgres".to_string()),
            host: lookup("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            name: lookup("DB_NAME").unwrap_or_else(|| "qrmenu".to_string()),
            password: lookup("DB_PASSWORD").unwrap_or_else(|| "postgres".to_string()),
            port: lookup("DB_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5432),
            max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            leak_timeout: Duration::from_millis(
                lookup("DB_LEAK_TIMEOUT_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5000),
            ),
            acquire_timeout: Duration::from_millis(
                lookup("DB_ACQUIRE_TIMEOUT_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30_000),
            ),
        }
    }

    /// Connection options built from the discrete fields.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.name)
    }
}

/// Service configuration: database settings plus the bind address.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db: DbConfig,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            db: DbConfig::from_lookup(&lookup),
            host: lookup("BACKEND_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("BACKEND_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
        }
    }
}
