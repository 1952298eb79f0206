use super::*;
use crate::config::OllamaConfig;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ranked_chunk(rank: usize, content: &str, score: f32) -> RankedChunk {
    RankedChunk {
        rank,
        chunk_id: format!("chunk-{rank}"),
        document_id: "doc-1".to_string(),
        source_path: "/tmp/doc.txt".to_string(),
        content: content.to_string(),
        sequence_index: u32::try_from(rank).unwrap_or(0),
        similarity_score: score,
        score,
    }
}

#[test]
fn prompt_always_contains_the_query() {
    let prompt = build_prompt("what is the revenue?", &[], 64);
    assert!(prompt.contains("what is the revenue?"));
    assert!(prompt.contains("(no relevant context found)"));
}

#[test]
fn prompt_fills_chunks_in_rank_order_until_budget() {
    let ranked = vec![
        ranked_chunk(1, &"a".repeat(100), 0.9),
        ranked_chunk(2, &"b".repeat(100), 0.8),
        ranked_chunk(3, &"c".repeat(5000), 0.7),
        ranked_chunk(4, &"d".repeat(100), 0.6),
    ];
    let prompt = build_prompt("query", &ranked, 600);

    assert!(prompt.contains(&"a".repeat(100)));
    assert!(prompt.contains(&"b".repeat(100)));
    // The oversized chunk stops the fill; later chunks are not considered.
    assert!(!prompt.contains(&"c".repeat(100)));
    assert!(!prompt.contains(&"d".repeat(100)));
}

#[test]
fn prompt_with_generous_budget_includes_everything() {
    let ranked = vec![
        ranked_chunk(1, "first chunk", 0.9),
        ranked_chunk(2, "second chunk", 0.8),
    ];
    let prompt = build_prompt("query", &ranked, 10_000);
    assert!(prompt.contains("first chunk"));
    assert!(prompt.contains("second chunk"));
}

#[test]
fn report_escapes_html() {
    let ranked = vec![ranked_chunk(1, "<script>alert(1)</script>", 0.5)];
    let report = render_report("a <b> query", "an & answer", &ranked);
    assert!(report.contains("a &lt;b&gt; query"));
    assert!(report.contains("an &amp; answer"));
    assert!(!report.contains("<script>alert"));
}

#[test]
fn chart_renders_one_bar_per_chunk() {
    let ranked = vec![
        ranked_chunk(1, "x", 0.9),
        ranked_chunk(2, "y", 0.4),
    ];
    let chart = render_chart("query", &ranked);
    assert_eq!(chart.matches("class=\"row\"").count(), 2);
    assert!(chart.contains("width: 90%"));
    assert!(chart.contains("width: 40%"));
}

#[tokio::test(flavor = "multi_thread")]
async fn synthesize_generates_answer_and_writes_artifacts() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"response": "Revenue grew 12%."}"#),
        )
        .mount(&mock_server)
        .await;

    let server_url = url::Url::parse(&mock_server.uri()).expect("valid url");
    let config = OllamaConfig {
        protocol: server_url.scheme().to_string(),
        host: server_url.host_str().expect("has host").to_string(),
        port: server_url.port().expect("has port"),
        ..OllamaConfig::default()
    };

    let temp_dir = TempDir::new().expect("can create temp dir");
    let artifacts_dir = temp_dir.path().join("artifacts");

    let synthesis = tokio::task::spawn_blocking({
        let artifacts_dir = artifacts_dir.clone();
        move || {
            let client = GenerationClient::new(&config).expect("can build client");
            let synthesizer = Synthesizer::new(&client, artifacts_dir, 4000);
            synthesizer.synthesize(
                "how did revenue develop?",
                &[ranked_chunk(1, "Revenue grew 12% year over year.", 0.9)],
            )
        }
    })
    .await
    .expect("task completes")
    .expect("synthesis succeeds");

    assert_eq!(synthesis.answer, "Revenue grew 12%.");
    assert!(synthesis.report_path.exists());
    assert!(synthesis.chart_path.exists());

    let report = std::fs::read_to_string(&synthesis.report_path).expect("can read report");
    assert!(report.contains("how did revenue develop?"));
    assert!(report.contains("Revenue grew 12%."));
}
