use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::models::{NewSearchHistory, NewStoreRecord, SearchHistoryRecord, StoreRecord};

pub struct StoreQueries;

impl StoreQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, new_store: NewStoreRecord) -> Result<StoreRecord> {
        let now = Utc::now().naive_utc();
        sqlx::query(
            "INSERT INTO vector_stores (id, name, document_count, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&new_store.id)
        .bind(&new_store.name)
        .bind(new_store.document_count)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create store record")?;

        Self::get_by_id(pool, &new_store.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created store record"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: &str) -> Result<Option<StoreRecord>> {
        sqlx::query_as::<_, StoreRecord>(
            "SELECT id, name, document_count, created_at FROM vector_stores WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get store by id")
    }

    /// All stores, newest first.
    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<StoreRecord>> {
        sqlx::query_as::<_, StoreRecord>(
            "SELECT id, name, document_count, created_at FROM vector_stores ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(pool)
        .await
        .context("Failed to list stores")
    }

    /// The most recently created store. Ties on `created_at` resolve to the
    /// greatest id, which for timestamped ids is the same ordering.
    #[inline]
    pub async fn latest(pool: &SqlitePool) -> Result<Option<StoreRecord>> {
        sqlx::query_as::<_, StoreRecord>(
            "SELECT id, name, document_count, created_at FROM vector_stores ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(pool)
        .await
        .context("Failed to get latest store")
    }

    /// Remove a registry row. Returns false when the id was already absent.
    #[inline]
    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM vector_stores WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to delete store record")?;

        debug!("Deleted {} registry rows for store {}", result.rows_affected(), id);
        Ok(result.rows_affected() > 0)
    }
}

pub struct SearchHistoryQueries;

impl SearchHistoryQueries {
    #[inline]
    pub async fn append(
        pool: &SqlitePool,
        entry: NewSearchHistory,
    ) -> Result<SearchHistoryRecord> {
        let now = Utc::now().naive_utc();
        let id = sqlx::query(
            r#"
            INSERT INTO search_history
                (query, store_id, result_summary, ai_answer, report_path, chart_path, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.query)
        .bind(&entry.store_id)
        .bind(&entry.result_summary)
        .bind(&entry.ai_answer)
        .bind(&entry.report_path)
        .bind(&entry.chart_path)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to append search history")?
        .last_insert_rowid();

        sqlx::query_as::<_, SearchHistoryRecord>(
            r#"
            SELECT id, query, store_id, result_summary, ai_answer, report_path, chart_path, created_at
            FROM search_history WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
        .context("Failed to retrieve appended search history row")
    }

    #[inline]
    pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<SearchHistoryRecord>> {
        sqlx::query_as::<_, SearchHistoryRecord>(
            r#"
            SELECT id, query, store_id, result_summary, ai_answer, report_path, chart_path, created_at
            FROM search_history ORDER BY created_at DESC, id DESC LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list search history")
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM search_history")
            .fetch_one(pool)
            .await
            .context("Failed to count search history")?;
        Ok(row.0)
    }
}
