use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{config::AppConfig, error::AppError};

/// Build a lazily-connecting pool so the server can boot before the
/// database is reachable.
pub fn create_pool(config: &AppConfig) -> Result<Option<PgPool>, AppError> {
    let Some(url) = config.database_url.as_deref() else {
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.db_pool_max_connections.max(1))
        .min_connections(
            config
                .db_pool_min_connections
                .min(config.db_pool_max_connections.max(1)),
        )
        .acquire_timeout(Duration::from_secs(config.db_pool_acquire_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.db_pool_idle_timeout_seconds))
        .connect_lazy(url)
        .map_err(|error| AppError::Dependency(format!("Invalid DATABASE_URL: {error}")))?;

    Ok(Some(pool))
}
