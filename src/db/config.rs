use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, DbConfigError> {
        let url = std::env::var("DATABASE_URL").map_err(|_| DbConfigError::Missing {
            key: "DATABASE_URL",
        })?;

        let max_connections = env_u32("DATABASE_MAX_CONNECTIONS").unwrap_or(10);
        let acquire_timeout =
            Duration::from_secs(env_u64("DATABASE_ACQUIRE_TIMEOUT_SECS").unwrap_or(5));

        Ok(Self {
            url,
            max_connections,
            acquire_timeout,
        })
    }
}

#[derive(Debug, Error)]
pub enum DbConfigError {
    #[error("missing environment variable: {key}")]
    Missing { key: &'static str },
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok()?.trim().parse().ok()
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.trim().parse().ok()
}
