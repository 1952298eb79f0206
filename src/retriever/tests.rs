use super::*;
use crate::database::lancedb::{ChunkMetadata, EmbeddingRecord};
use crate::database::sqlite::models::NewStoreRecord;
use tempfile::TempDir;

const DIM: usize = 4;

async fn test_fixtures() -> (Database, VectorStore, TempDir) {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let database = Database::new(temp_dir.path().join("metadata.db"))
        .await
        .expect("can create database");
    let vectors = VectorStore::open(temp_dir.path().join("vectors"))
        .await
        .expect("can open vector store");
    (database, vectors, temp_dir)
}

async fn seed_store(database: &Database, vectors: &VectorStore, store_id: &str) {
    database
        .insert_store(&NewStoreRecord {
            id: store_id.to_string(),
            name: store_id.to_string(),
            document_count: 1,
        })
        .await
        .expect("can register store");
    vectors
        .create_store(store_id, DIM)
        .await
        .expect("can create vector table");
}

fn record(chunk_id: &str, sequence_index: u32, vector: Vec<f32>) -> EmbeddingRecord {
    EmbeddingRecord {
        id: format!("vec-{chunk_id}"),
        vector,
        model_id: "nomic-embed-text:latest".to_string(),
        metadata: ChunkMetadata {
            chunk_id: chunk_id.to_string(),
            document_id: "doc-1".to_string(),
            source_path: "/tmp/doc.txt".to_string(),
            content: format!("chunk {chunk_id}"),
            sequence_index,
            start_offset: 0,
            end_offset: 10,
            created_at: "2026-08-30T12:00:00Z".to_string(),
        },
    }
}

#[tokio::test]
async fn explicit_store_must_exist() {
    let (database, vectors, _temp_dir) = test_fixtures().await;
    let search = SearchConfig::default();
    let retriever = Retriever::new(&database, &vectors, &search);

    let result = retriever.resolve_store(Some("20260830_999999")).await;
    assert!(matches!(result, Err(RagError::StoreNotFound(ref id)) if id == "20260830_999999"));
}

#[tokio::test]
async fn implicit_store_requires_a_registry_entry() {
    let (database, vectors, _temp_dir) = test_fixtures().await;
    let search = SearchConfig::default();
    let retriever = Retriever::new(&database, &vectors, &search);

    let result = retriever.resolve_store(None).await;
    assert!(matches!(result, Err(RagError::NoStoreAvailable)));
}

#[tokio::test]
async fn implicit_store_resolves_to_latest() {
    let (database, vectors, _temp_dir) = test_fixtures().await;
    seed_store(&database, &vectors, "20260830_100000").await;
    seed_store(&database, &vectors, "20260830_110000").await;

    let search = SearchConfig::default();
    let retriever = Retriever::new(&database, &vectors, &search);

    let resolved = retriever.resolve_store(None).await.expect("resolves");
    assert_eq!(resolved.id, "20260830_110000");

    let explicit = retriever
        .resolve_store(Some("20260830_100000"))
        .await
        .expect("resolves");
    assert_eq!(explicit.id, "20260830_100000");
}

#[tokio::test]
async fn retrieve_caps_at_top_k_and_sorts_by_similarity() {
    let (database, vectors, _temp_dir) = test_fixtures().await;
    seed_store(&database, &vectors, "20260830_120000").await;
    vectors
        .store_embeddings_batch(
            "20260830_120000",
            &[
                record("c0", 0, vec![1.0, 0.0, 0.0, 0.0]),
                record("c1", 1, vec![0.0, 1.0, 0.0, 0.0]),
                record("c2", 2, vec![0.9, 0.1, 0.0, 0.0]),
            ],
        )
        .await
        .expect("can store embeddings");

    let search = SearchConfig {
        top_k: 2,
        ..SearchConfig::default()
    };
    let retriever = Retriever::new(&database, &vectors, &search);

    let hits = retriever
        .retrieve("20260830_120000", &[1.0, 0.0, 0.0, 0.0])
        .await
        .expect("can retrieve");
    assert_eq!(hits.len(), 2);
    assert!(hits[0].similarity_score >= hits[1].similarity_score);
    assert_eq!(hits[0].chunk_metadata.chunk_id, "c0");
}

#[tokio::test]
async fn similarity_floor_filters_weak_hits() {
    let (database, vectors, _temp_dir) = test_fixtures().await;
    seed_store(&database, &vectors, "20260830_120000").await;
    vectors
        .store_embeddings_batch(
            "20260830_120000",
            &[
                record("c0", 0, vec![1.0, 0.0, 0.0, 0.0]),
                record("c1", 1, vec![0.0, 1.0, 0.0, 0.0]),
            ],
        )
        .await
        .expect("can store embeddings");

    let search = SearchConfig {
        similarity_floor: 0.5,
        ..SearchConfig::default()
    };
    let retriever = Retriever::new(&database, &vectors, &search);

    let hits = retriever
        .retrieve("20260830_120000", &[1.0, 0.0, 0.0, 0.0])
        .await
        .expect("can retrieve");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk_metadata.chunk_id, "c0");
}
