use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::{ConnectOptions, Connection, PgConnection};

use crate::config::StoreConfig;
use crate::store::pool::ManageConnection;
use crate::store::StoreError;

/// Opens raw Postgres connections from the configured endpoint parameters.
#[derive(Debug, Clone)]
pub struct PgManager {
    options: PgConnectOptions,
}

impl PgManager {
    pub fn new(config: &StoreConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.dbname)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(ssl_mode(&config.sslmode));
        Self { options }
    }
}

/// Unknown modes fall back to `disable`, the configuration default.
fn ssl_mode(value: &str) -> PgSslMode {
    match value {
        "allow" => PgSslMode::Allow,
        "prefer" => PgSslMode::Prefer,
        "require" => PgSslMode::Require,
        "verify-ca" => PgSslMode::VerifyCa,
        "verify-full" => PgSslMode::VerifyFull,
        _ => PgSslMode::Disable,
    }
}

#[async_trait]
impl ManageConnection for PgManager {
    type Connection = PgConnection;

    async fn connect(&self) -> Result<PgConnection, StoreError> {
        self.options.connect().await.map_err(StoreError::Setup)
    }

    async fn close(&self, conn: PgConnection) {
        let _ = conn.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssl_mode_maps_known_values() {
        assert!(matches!(ssl_mode("disable"), PgSslMode::Disable));
        assert!(matches!(ssl_mode("require"), PgSslMode::Require));
        assert!(matches!(ssl_mode("verify-full"), PgSslMode::VerifyFull));
    }

    #[test]
    fn ssl_mode_defaults_unknown_values_to_disable() {
        assert!(matches!(ssl_mode(""), PgSslMode::Disable));
        assert!(matches!(ssl_mode("REQUIRE"), PgSslMode::Disable));
        assert!(matches!(ssl_mode("anything"), PgSslMode::Disable));
    }
}
