use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Which market-data source backs the price service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Yahoo,
    TwelveData,
    /// Twelve Data first, Yahoo for whatever it could not price.
    Multi,
}

impl FromStr for ProviderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yahoo" => Ok(ProviderKind::Yahoo),
            "twelvedata" => Ok(ProviderKind::TwelveData),
            "multi" => Ok(ProviderKind::Multi),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub price_provider: ProviderKind,
    pub quote_cache_ttl: Duration,
    pub price_fetch_timeout: Duration,
    pub cors_allow_origin: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            db_max_connections: 10,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            price_provider: ProviderKind::Yahoo,
            quote_cache_ttl: Duration::from_secs(60),
            price_fetch_timeout: Duration::from_secs(10),
            cors_allow_origin: "*".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests don't have to touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        Ok(Self {
            database_url,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            bind_addr: parse_or(&lookup, "BIND_ADDR", defaults.bind_addr)?,
            price_provider: parse_or(&lookup, "PRICE_PROVIDER", defaults.price_provider)?,
            quote_cache_ttl: Duration::from_secs(parse_or(
                &lookup,
                "QUOTE_CACHE_TTL_SECS",
                defaults.quote_cache_ttl.as_secs(),
            )?),
            price_fetch_timeout: Duration::from_secs(parse_or(
                &lookup,
                "PRICE_FETCH_TIMEOUT_SECS",
                defaults.price_fetch_timeout.as_secs(),
            )?),
            cors_allow_origin: lookup("CORS_ALLOW_ORIGIN").unwrap_or(defaults.cors_allow_origin),
        })
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}
