use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    /// Shared secret required by the bulk-delete routes.
    pub bulk_delete_passkey: String,
    pub host: String,
    pub port: u16,
}

impl DatabaseConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://db_data/database.db".into()),
            max_connections: parsed_var("DATABASE_MAX_CONNECTIONS")?.unwrap_or(5),
        })
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database = DatabaseConfig::from_env()?;

        // Secrets have no fallback: a missing value is a startup error.
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "wedding-rsvp".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "wedding-rsvp-admin".into()),
            ttl_minutes: parsed_var("JWT_TTL_MINUTES")?.unwrap_or(30),
        };
        let bulk_delete_passkey = std::env::var("BULK_DELETE_PASSKEY")
            .context("BULK_DELETE_PASSKEY must be set")?;

        if jwt.secret.is_empty() || bulk_delete_passkey.is_empty() {
            anyhow::bail!("JWT_SECRET and BULK_DELETE_PASSKEY must not be empty");
        }

        Ok(Self {
            database,
            jwt,
            bulk_delete_passkey,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parsed_var("APP_PORT")?.unwrap_or(8080),
        })
    }
}

fn parsed_var<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("invalid value for {name}: {raw:?}")),
        Err(_) => Ok(None),
    }
}
