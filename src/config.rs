/*
 * Responsibility
 * - read settings from the environment (.env supported)
 * - validate them up front (missing or malformed values abort startup)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

pub const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: u64 = 30;
// One year.
pub const MAX_ACCESS_TOKEN_EXPIRE_MINUTES: u64 = 525_600;

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub database_url: String,
    pub database_max_connections: u32,

    // HS256 signing secret for session tokens
    pub secret_key: String,
    pub access_token_expire_minutes: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the signing secret
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("database_url", &self.database_url)
            .field("database_max_connections", &self.database_max_connections)
            .field(
                "access_token_expire_minutes",
                &self.access_token_expire_minutes,
            )
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Expects `.env` to be loaded already (see `app::run`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let port: u16 = match std::env::var("PORT") {
            Ok(s) => s.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            Err(_) => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let database_max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(10);

        let secret_key =
            std::env::var("SECRET_KEY").map_err(|_| ConfigError::Missing("SECRET_KEY"))?;
        if secret_key.trim().is_empty() {
            return Err(ConfigError::Invalid("SECRET_KEY"));
        }

        let access_token_expire_minutes =
            parse_expire_minutes(std::env::var("ACCESS_TOKEN_EXPIRE_MINUTES").ok().as_deref())?;

        Ok(Self {
            addr,
            app_env,
            database_url,
            database_max_connections,
            secret_key,
            access_token_expire_minutes,
        })
    }
}

fn parse_expire_minutes(raw: Option<&str>) -> Result<u64, ConfigError> {
    match raw {
        Some(v) => v
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|v| (1..=MAX_ACCESS_TOKEN_EXPIRE_MINUTES).contains(v))
            .ok_or(ConfigError::Invalid("ACCESS_TOKEN_EXPIRE_MINUTES")),
        None => Ok(DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES),
    }
}
