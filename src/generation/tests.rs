use super::*;
use crate::config::OllamaConfig;

fn test_config(port: u16) -> OllamaConfig {
    OllamaConfig {
        host: "127.0.0.1".to_string(),
        port,
        generation_model: "test-gen".to_string(),
        ..OllamaConfig::default()
    }
}

#[test]
fn unreachable_service_fails_fast() {
    let client = GenerationClient::new(&test_config(1)).expect("Failed to create client");

    let err = client.generate("a prompt").expect_err("generate must fail");
    assert!(matches!(err, RagError::GenerationServiceUnavailable(_)));
    assert!(err.is_service_unavailable());

    let err = client.ping().expect_err("ping must fail");
    assert!(matches!(err, RagError::GenerationServiceUnavailable(_)));
}

#[tokio::test]
async fn generate_parses_service_response() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "The answer is 42."
            })),
        )
        .mount(&server)
        .await;

    let port = server.address().port();
    let client = GenerationClient::new(&test_config(port)).expect("Failed to create client");
    assert_eq!(client.model_id(), "test-gen");

    let answer = tokio::task::spawn_blocking(move || client.generate("what is the answer?"))
        .await
        .expect("task completes")
        .expect("generate succeeds");
    assert_eq!(answer, "The answer is 42.");
}
