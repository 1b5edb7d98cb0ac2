use anyhow::Context;
use serde::Deserialize;

/// Connection and pool settings for the credential store, sourced from
/// the `PG_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub sslmode: String,
    /// Warm connections held open.
    pub pool_min: u32,
    /// Max concurrent connections.
    pub pool_max: u32,
}

impl StoreConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: std::env::var("PG_HOST").context("PG_HOST is required")?,
            port: std::env::var("PG_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(5432),
            dbname: std::env::var("PG_DBNAME").context("PG_DBNAME is required")?,
            user: std::env::var("PG_USER").context("PG_USER is required")?,
            password: std::env::var("PG_PASSWORD").context("PG_PASSWORD is required")?,
            sslmode: std::env::var("PG_SSLMODE").unwrap_or_else(|_| "disable".into()),
            pool_min: std::env::var("PG_POOL_MIN")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(1),
            pool_max: std::env::var("PG_POOL_MAX")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(5),
        })
    }
}
