use crate::config::AppConfig;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = crate::db::connect(&config.database).await?;
        crate::db::migrate(&db).await?;
        Ok(Self { db, config })
    }

    pub fn from_parts(db: SqlitePool, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }

    /// State backed by an in-memory database with fixed test secrets.
    #[cfg(test)]
    pub async fn fake() -> Self {
        let config = Arc::new(AppConfig {
            database: crate::config::DatabaseConfig {
                url: "sqlite::memory:".into(),
                max_connections: 1,
            },
            jwt: crate::config::JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            bulk_delete_passkey: "test-passkey".into(),
            host: "127.0.0.1".into(),
            port: 0,
        });
        Self::from_parts(crate::db::memory_pool().await, config)
    }
}
