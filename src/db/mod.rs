pub mod config;
pub mod migrate;
pub mod operations;

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

use crate::db::config::{DbConfig, DbConfigError};

#[derive(Clone)]
pub struct DatabaseProxy {
    config: DbConfig,
    pool: PgPool,
}

impl DatabaseProxy {
    pub async fn from_env() -> Result<Arc<Self>, DbInitError> {
        let config = DbConfig::from_env()?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await
            .map_err(DbInitError::Sqlx)?;

        Ok(Arc::new(Self { config, pool }))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn connection_string(&self) -> &str {
        &self.config.url
    }

    pub async fn check_connection(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error(transparent)]
    Config(#[from] DbConfigError),
    #[error(transparent)]
    Sqlx(sqlx::Error),
}
