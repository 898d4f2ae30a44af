use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::DatabaseConfig;
use crate::error::{AppError, Result};

/// Lazily connected database handle.
///
/// The pool is created on first use and then shared by every request for the
/// rest of the process lifetime. There is no health check and no reconnect:
/// if the connection goes bad the process has to be restarted.
#[derive(Clone)]
pub struct Database {
    uri: Arc<str>,
    max_connections: u32,
    pool: Arc<OnceCell<SqlitePool>>,
}

impl Database {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            uri: Arc::from(config.uri.as_str()),
            max_connections: config.max_connections.max(1),
            pool: Arc::new(OnceCell::new()),
        }
    }

    /// Get the connection pool, connecting and migrating on first call
    pub async fn pool(&self) -> Result<&SqlitePool> {
        if let Some(pool) = self.pool.get() {
            tracing::trace!("Using cached database connection");
            return Ok(pool);
        }

        self.pool
            .get_or_try_init(|| async {
                tracing::info!("Connecting to database");
                let pool = SqlitePoolOptions::new()
                    .max_connections(self.max_connections)
                    .connect(&self.uri)
                    .await?;
                Self::run_migrations(&pool).await?;
                Ok::<_, AppError>(pool)
            })
            .await
    }

    #[cfg(test)]
    pub(crate) fn is_connected(&self) -> bool {
        self.pool.initialized()
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS files (
                file_name TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_created_at ON files(created_at)")
            .execute(pool)
            .await?;

        tracing::info!("Database migrations completed");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn memory_database() -> Database {
    Database::new(&DatabaseConfig {
        uri: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connects_lazily_once() {
        let db = memory_database();
        assert!(!db.is_connected());

        let first = db.pool().await.unwrap() as *const SqlitePool;
        assert!(db.is_connected());

        let clone = db.clone();
        let second = clone.pool().await.unwrap() as *const SqlitePool;
        assert_eq!(first, second);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_shares_one_pool() {
        let db = memory_database();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move {
                    db.pool().await.map(|pool| pool as *const SqlitePool as usize)
                })
            })
            .collect();

        let mut addrs = Vec::new();
        for handle in handles {
            addrs.push(handle.await.unwrap().unwrap());
        }
        addrs.dedup();
        assert_eq!(addrs.len(), 1);
        assert_eq!(addrs[0], db.pool().await.unwrap() as *const SqlitePool as usize);
    }

    #[tokio::test]
    async fn test_migrations_create_files_table() {
        let db = memory_database();
        let pool = db.pool().await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_bad_uri_is_an_error() {
        let db = Database::new(&DatabaseConfig {
            uri: "sqlite:/nonexistent-dir/sub/files.db".to_string(),
            max_connections: 1,
        });
        assert!(db.pool().await.is_err());
        assert!(!db.is_connected());
    }
}
