use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use capture_core::config::DatabaseConfig;
use capture_core::error::{CaptureError, Result};

/// Database connection wrapper providing connection pooling.
#[derive(Clone)]
pub struct Database {
    /// Primary connection pool.
    primary: Arc<PgPool>,

    /// Configuration.
    config: DatabaseConfig,
}

impl Database {
    /// Create a new database connection from configuration.
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let primary = Self::create_pool(&config.url, config.pool_size, config.pool_timeout_secs)
            .await
            .map_err(|e| CaptureError::Database(format!("Failed to connect to primary: {}", e)))?;

        Ok(Self {
            primary: Arc::new(primary),
            config: config.clone(),
        })
    }

    /// Create a connection pool with the given parameters.
    async fn create_pool(url: &str, size: u32, timeout_secs: u64) -> sqlx::Result<PgPool> {
        PgPoolOptions::new()
            .max_connections(size)
            .acquire_timeout(Duration::from_secs(timeout_secs))
            .connect(url)
            .await
    }

    /// Get the primary pool for reads and writes.
    pub fn primary(&self) -> &PgPool {
        &self.primary
    }

    /// Get the configuration this database was built from.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(self.primary.as_ref())
            .await
            .map_err(|e| CaptureError::Database(format!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Close all connections gracefully.
    pub async fn close(&self) {
        self.primary.close().await;
    }
}

/// Type alias for the pool type.
pub type DatabasePool = PgPool;

#[cfg(test)]
mod tests {
    use super::*;

    // Integration tests require a real PostgreSQL connection.
    // These are placeholder tests that don't require a database.

    #[test]
    fn test_database_config_clone() {
        let config = DatabaseConfig {
            url: "postgres://localhost/test".to_string(),
            pool_size: 10,
            ..Default::default()
        };

        let cloned = config.clone();
        assert_eq!(cloned.url, config.url);
        assert_eq!(cloned.pool_size, config.pool_size);
    }
}
