use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::CONFIG;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Lazily created connection pool for the store database
pub struct DatabaseManager {
    pool: RwLock<Option<PgPool>>,
}

impl DatabaseManager {
    fn instance() -> &'static DatabaseManager {
        use std::sync::OnceLock;
        static INSTANCE: OnceLock<DatabaseManager> = OnceLock::new();
        INSTANCE.get_or_init(|| DatabaseManager {
            pool: RwLock::new(None),
        })
    }

    /// Get the main pool, connecting on first use
    pub async fn main_pool() -> Result<PgPool, DatabaseError> {
        let manager = Self::instance();

        // Fast path: try read lock
        if let Some(pool) = manager.pool.read().await.as_ref() {
            return Ok(pool.clone());
        }

        let mut slot = manager.pool.write().await;
        if let Some(pool) = slot.as_ref() {
            return Ok(pool.clone());
        }

        let connection_string = Self::connection_string()?;
        let pool = PgPoolOptions::new()
            .max_connections(CONFIG.database.max_connections)
            .acquire_timeout(Duration::from_secs(CONFIG.database.connection_timeout))
            .connect(&connection_string)
            .await?;

        info!(
            max_connections = CONFIG.database.max_connections,
            "Created database pool"
        );
        *slot = Some(pool.clone());
        Ok(pool)
    }

    fn connection_string() -> Result<String, DatabaseError> {
        let raw = std::env::var("DATABASE_URL")
            .map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;
        Self::validate_url(&raw)
    }

    fn validate_url(raw: &str) -> Result<String, DatabaseError> {
        let url = url::Url::parse(raw).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        match url.scheme() {
            "postgres" | "postgresql" => {}
            _ => return Err(DatabaseError::InvalidDatabaseUrl),
        }
        // Database name is required
        if url.path().trim_start_matches('/').is_empty() {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }
        Ok(url.into())
    }

    /// Pings the main pool to ensure connectivity
    pub async fn health_check() -> Result<(), DatabaseError> {
        let pool = Self::main_pool().await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }

    /// Close the pool (e.g., on shutdown)
    pub async fn close() {
        if let Some(pool) = Self::instance().pool.write().await.take() {
            pool.close().await;
            info!("Closed database pool");
        }
    }
}
