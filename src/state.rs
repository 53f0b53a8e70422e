use std::sync::Arc;

use sqlx::PgPool;

use crate::{config::AppConfig, db::create_pool, error::AppError, repository::postgres::PgStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db_pool: Option<PgPool>,
}

impl AppState {
    pub fn build(config: AppConfig) -> Result<Self, AppError> {
        let db_pool = create_pool(&config)?;
        if db_pool.is_none() {
            tracing::warn!("DATABASE_URL is not set; obligation endpoints will return 502");
        }
        Ok(Self {
            config: Arc::new(config),
            db_pool,
        })
    }

    pub fn store(&self) -> Result<PgStore, AppError> {
        self.db_pool
            .as_ref()
            .map(|pool| PgStore::new(pool.clone()))
            .ok_or_else(|| {
                AppError::Dependency(
                    "Database is not configured. Set DATABASE_URL.".to_string(),
                )
            })
    }
}
