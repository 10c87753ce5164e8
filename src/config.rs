//! Process configuration, read from the environment.

use anyhow::{bail, Context};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_access_ttl_minutes: i64,
    pub jwt_refresh_ttl_minutes: i64,
    pub nats_url: Option<String>,
    pub admin: Option<AdminAccount>,
    /// Load the demo catalog at startup when the store is empty.
    pub seed_sample_data: bool,
}

#[derive(Clone)]
pub struct AdminAccount {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("database", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("database_max_connections", &self.database_max_connections)
            .field("jwt_access_ttl_minutes", &self.jwt_access_ttl_minutes)
            .field("jwt_refresh_ttl_minutes", &self.jwt_refresh_ttl_minutes)
            .field("nats_url", &self.nats_url)
            .field("admin", &self.admin.as_ref().map(|a| a.email.as_str()))
            .field("seed_sample_data", &self.seed_sample_data)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let database_url = var("DATABASE_URL");
        let jwt_secret = match (var("JWT_SECRET"), &database_url) {
            (Some(secret), _) => secret,
            (None, Some(_)) => bail!("JWT_SECRET must be set when DATABASE_URL is configured"),
            (None, None) => format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()),
        };
        let admin = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminAccount { email, password }),
            _ => None,
        };
        Ok(Self {
            port: parse(&var, "PORT", 8000)?,
            database_url,
            database_max_connections: parse(&var, "DATABASE_MAX_CONNECTIONS", 10)?,
            jwt_secret,
            jwt_access_ttl_minutes: parse(&var, "JWT_ACCESS_TTL_MINUTES", 60)?,
            jwt_refresh_ttl_minutes: parse(&var, "JWT_REFRESH_TTL_MINUTES", 1440)?,
            nats_url: var("NATS_URL"),
            admin,
            seed_sample_data: parse(&var, "SEED_SAMPLE_DATA", false)?,
        })
    }
}

fn parse<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
