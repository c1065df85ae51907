//! Service configuration from environment variables
//!
//! `.env` is loaded by the binaries before `ServiceConfig::from_env` runs.

use crate::error::QueryServiceError;
use crate::rates::DEFAULT_RATE_TTL;
use crate::store::sqlite::DEFAULT_MAX_RAW_ROWS;
use crate::Result;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/rent_roll.db";
pub const DEFAULT_PORT: u16 = 3100;

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub database_url: String,
    pub port: u16,
    pub rate_cache_ttl: Duration,
    pub raw_query_max_rows: usize,
    /// Live rate endpoint; static rates when unset
    pub financial_rates_url: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            port: DEFAULT_PORT,
            rate_cache_ttl: DEFAULT_RATE_TTL,
            raw_query_max_rows: DEFAULT_MAX_RAW_ROWS,
            financial_rates_url: None,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => parse("PORT", &raw)?,
            None => defaults.port,
        };

        let rate_cache_ttl = match get("RATE_CACHE_TTL_SECS") {
            Some(raw) => Duration::from_secs(parse("RATE_CACHE_TTL_SECS", &raw)?),
            None => defaults.rate_cache_ttl,
        };

        let raw_query_max_rows = match get("RAW_QUERY_MAX_ROWS") {
            Some(raw) => parse("RAW_QUERY_MAX_ROWS", &raw)?,
            None => defaults.raw_query_max_rows,
        };

        if raw_query_max_rows == 0 {
            return Err(QueryServiceError::ConfigError(
                "RAW_QUERY_MAX_ROWS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            port,
            rate_cache_ttl,
            raw_query_max_rows,
            financial_rates_url: get("FINANCIAL_RATES_URL"),
        })
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        QueryServiceError::ConfigError(format!("{} has an invalid value: {:?}", key, raw))
    })
}
