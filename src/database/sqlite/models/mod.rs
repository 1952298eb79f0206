use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A committed vector store as recorded in the registry.
///
/// Store ids are `YYYYMMDD_HHMMSS` timestamps, so lexicographic and temporal
/// order agree; the resolver for "most recent store" relies on this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StoreRecord {
    pub id: String,
    pub name: String,
    pub document_count: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStoreRecord {
    pub id: String,
    pub name: String,
    pub document_count: i64,
}

/// One completed query, retained as history. The ranked results are stored
/// as a JSON snapshot captured at query time, not live chunk references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SearchHistoryRecord {
    pub id: i64,
    pub query: String,
    pub store_id: String,
    pub result_summary: String,
    pub ai_answer: String,
    pub report_path: Option<String>,
    pub chart_path: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSearchHistory {
    pub query: String,
    pub store_id: String,
    pub result_summary: String,
    pub ai_answer: String,
    pub report_path: Option<String>,
    pub chart_path: Option<String>,
}
