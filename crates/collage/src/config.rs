//! Environment-driven configuration.
//!
//! There is no CLI; everything comes from environment variables (a `.env`
//! file is honored for development).

use std::str::FromStr;

use crate::error::{EngineError, EngineResult};

/// Runtime settings for an application embedding the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// `DATABASE_URL` (required)
    pub database_url: String,
    /// `LOG_LEVEL` (default `info`)
    pub log_level: String,
    /// `POOL_SIZE` (default 16)
    pub pool_size: usize,
    /// `DEFAULT_ROW_LIMIT`: ceiling applied to limitless compositions
    /// (default 1000)
    pub default_row_limit: i64,
}

impl EngineConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| EngineError::Configuration("DATABASE_URL is not set".into()))?;

        Ok(Self {
            database_url,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            pool_size: parse_or("POOL_SIZE", std::env::var("POOL_SIZE").ok(), 16)?,
            default_row_limit: parse_or(
                "DEFAULT_ROW_LIMIT",
                std::env::var("DEFAULT_ROW_LIMIT").ok(),
                1000,
            )?,
        })
    }

    /// Build the shared connection pool from this configuration.
    #[cfg(feature = "pool")]
    pub fn create_pool(&self) -> EngineResult<deadpool_postgres::Pool> {
        crate::pool::create_pool_with_config(&self.database_url, self.pool_size)
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> EngineResult<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| EngineError::Configuration(format!("{key} has an invalid value: {raw}"))),
    }
}
