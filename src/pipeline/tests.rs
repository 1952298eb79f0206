use super::*;
use tempfile::TempDir;

async fn test_pipeline() -> (Pipeline, TempDir) {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let config = Config::load(temp_dir.path()).expect("can load default config");
    let pipeline = Pipeline::new(config).await.expect("can build pipeline");
    (pipeline, temp_dir)
}

#[test]
fn cancellation_token_is_shared() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());

    token.cancel();
    assert!(clone.is_cancelled());
}

#[test]
fn stage_labels() {
    assert_eq!(BuildStage::Loading.as_str(), "loading");
    assert_eq!(BuildStage::Committing.as_str(), "committing");
    assert_eq!(QueryStage::Synthesizing.as_str(), "synthesizing");
}

#[tokio::test]
async fn cancelled_build_never_starts_loading() {
    let (pipeline, temp_dir) = test_pipeline().await;
    pipeline.cancellation_token().cancel();

    let result = pipeline.build_store(temp_dir.path(), "docs").await;
    assert!(matches!(result, Err(RagError::Cancelled { ref stage }) if stage == "loading"));
}

#[tokio::test]
async fn cancelled_query_never_embeds() {
    let (pipeline, _temp_dir) = test_pipeline().await;
    pipeline.cancellation_token().cancel();

    let result = pipeline.query("anything", None).await;
    assert!(matches!(result, Err(RagError::Cancelled { ref stage }) if stage == "embedding"));
}

#[tokio::test]
async fn build_with_no_indexable_documents_fails_without_a_store() {
    let (pipeline, temp_dir) = test_pipeline().await;

    let docs_dir = temp_dir.path().join("docs");
    std::fs::create_dir_all(&docs_dir).expect("can create dir");
    std::fs::write(docs_dir.join("image.png"), b"not a document").expect("can write");

    let result = pipeline.build_store(&docs_dir, "docs").await;
    assert!(result.is_err());
    assert!(
        pipeline
            .list_stores()
            .await
            .expect("can list")
            .is_empty()
    );
}

#[tokio::test]
async fn delete_unknown_store_is_a_no_op() {
    let (pipeline, _temp_dir) = test_pipeline().await;
    let removed = pipeline
        .delete_store("20260830_000000")
        .await
        .expect("delete succeeds");
    assert!(!removed);
}
