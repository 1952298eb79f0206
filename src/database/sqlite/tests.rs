use super::*;
use tempfile::TempDir;

async fn test_database() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let db_path = temp_dir.path().join("metadata.db");
    let database = Database::new(&db_path).await.expect("can create database");
    (database, temp_dir)
}

fn new_store(id: &str, name: &str, document_count: i64) -> NewStoreRecord {
    NewStoreRecord {
        id: id.to_string(),
        name: name.to_string(),
        document_count,
    }
}

#[tokio::test]
async fn store_registry_round_trip() {
    let (database, _temp_dir) = test_database().await;

    let created = database
        .insert_store(&new_store("20260830_120000", "reports", 3))
        .await
        .expect("can insert store");
    assert_eq!(created.id, "20260830_120000");
    assert_eq!(created.name, "reports");
    assert_eq!(created.document_count, 3);

    let fetched = database
        .get_store("20260830_120000")
        .await
        .expect("can get store")
        .expect("store exists");
    assert_eq!(fetched, created);

    assert!(
        database
            .get_store("20260830_999999")
            .await
            .expect("query succeeds")
            .is_none()
    );
}

#[tokio::test]
async fn list_orders_newest_first() {
    let (database, _temp_dir) = test_database().await;

    database
        .insert_store(&new_store("20260830_100000", "first", 1))
        .await
        .expect("can insert");
    database
        .insert_store(&new_store("20260830_110000", "second", 1))
        .await
        .expect("can insert");

    let stores = database.list_stores().await.expect("can list stores");
    assert_eq!(stores.len(), 2);
    // Rows created in the same test run share a timestamp, so the id
    // tie-break decides.
    assert_eq!(stores[0].id, "20260830_110000");
    assert_eq!(stores[1].id, "20260830_100000");

    let latest = database
        .latest_store()
        .await
        .expect("can get latest")
        .expect("a store exists");
    assert_eq!(latest.id, "20260830_110000");
}

#[tokio::test]
async fn latest_on_empty_registry_is_none() {
    let (database, _temp_dir) = test_database().await;
    assert!(database.latest_store().await.expect("query succeeds").is_none());
}

#[tokio::test]
async fn delete_is_idempotent() {
    let (database, _temp_dir) = test_database().await;

    database
        .insert_store(&new_store("20260830_120000", "reports", 1))
        .await
        .expect("can insert");

    assert!(database.delete_store("20260830_120000").await.expect("delete succeeds"));
    assert!(!database.delete_store("20260830_120000").await.expect("second delete is no-op"));
    assert!(
        database
            .get_store("20260830_120000")
            .await
            .expect("query succeeds")
            .is_none()
    );
}

#[tokio::test]
async fn search_history_append_and_list() {
    let (database, _temp_dir) = test_database().await;

    let entry = NewSearchHistory {
        query: "quarterly revenue".to_string(),
        store_id: "20260830_120000".to_string(),
        result_summary: r#"[{"rank":1}]"#.to_string(),
        ai_answer: "Revenue grew 12%.".to_string(),
        report_path: Some("/tmp/report.html".to_string()),
        chart_path: Some("/tmp/chart.html".to_string()),
    };

    let appended = database
        .append_search_history(&entry)
        .await
        .expect("can append history");
    assert_eq!(appended.query, "quarterly revenue");
    assert_eq!(appended.ai_answer, "Revenue grew 12%.");

    let recent = database
        .recent_search_history(10)
        .await
        .expect("can list history");
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, appended.id);
}

#[tokio::test]
async fn migrations_are_rerunnable() {
    let (database, _temp_dir) = test_database().await;
    database.run_migrations().await.expect("second run succeeds");
    database.optimize().await.expect("optimize succeeds");
}
