use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::database::sqlite::models::{NewSearchHistory, NewStoreRecord, SearchHistoryRecord, StoreRecord};
use crate::database::sqlite::queries::{SearchHistoryQueries, StoreQueries};

#[cfg(test)]
mod tests;

pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    #[inline]
    pub async fn new<P: AsRef<Path>>(database_url: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_url)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    #[inline]
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    // Store registry operations

    #[inline]
    pub async fn insert_store(&self, store: &NewStoreRecord) -> Result<StoreRecord> {
        StoreQueries::create(&self.pool, store.clone()).await
    }

    #[inline]
    pub async fn get_store(&self, id: &str) -> Result<Option<StoreRecord>> {
        StoreQueries::get_by_id(&self.pool, id).await
    }

    #[inline]
    pub async fn list_stores(&self) -> Result<Vec<StoreRecord>> {
        StoreQueries::list_all(&self.pool).await
    }

    #[inline]
    pub async fn latest_store(&self) -> Result<Option<StoreRecord>> {
        StoreQueries::latest(&self.pool).await
    }

    #[inline]
    pub async fn delete_store(&self, id: &str) -> Result<bool> {
        StoreQueries::delete(&self.pool, id).await
    }

    // Search history bookkeeping (append-only; the pipeline writes rows but
    // never reads them back to make decisions)

    #[inline]
    pub async fn append_search_history(
        &self,
        entry: &NewSearchHistory,
    ) -> Result<SearchHistoryRecord> {
        SearchHistoryQueries::append(&self.pool, entry.clone()).await
    }

    #[inline]
    pub async fn recent_search_history(&self, limit: i64) -> Result<Vec<SearchHistoryRecord>> {
        SearchHistoryQueries::list_recent(&self.pool, limit).await
    }

    /// Optimize database performance by running VACUUM and ANALYZE
    #[inline]
    pub async fn optimize(&self) -> Result<()> {
        info!("Optimizing database performance");

        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .context("Failed to vacuum database")?;

        sqlx::query("ANALYZE")
            .execute(&self.pool)
            .await
            .context("Failed to analyze database")?;

        debug!("Database optimization completed");
        Ok(())
    }
}
