use super::*;
use crate::database::lancedb::ChunkMetadata;

fn hit(chunk_id: &str, sequence_index: u32, similarity: f32, content: &str) -> SearchHit {
    SearchHit {
        chunk_metadata: ChunkMetadata {
            chunk_id: chunk_id.to_string(),
            document_id: "doc-1".to_string(),
            source_path: "/tmp/doc.txt".to_string(),
            content: content.to_string(),
            sequence_index,
            start_offset: 0,
            end_offset: 10,
            created_at: "2026-08-30T12:00:00Z".to_string(),
        },
        model_id: "nomic-embed-text:latest".to_string(),
        similarity_score: similarity,
        distance: 1.0 - similarity,
    }
}

#[test]
fn orders_by_score_descending() {
    let search = SearchConfig::default();
    let ranked = rank_hits(
        "query",
        vec![
            hit("low", 0, 0.3, "a"),
            hit("high", 1, 0.9, "b"),
            hit("mid", 2, 0.6, "c"),
        ],
        &search,
    );

    let ids: Vec<&str> = ranked.iter().map(|c| c.chunk_id.as_str()).collect();
    assert_eq!(ids, vec!["high", "mid", "low"]);
    assert_eq!(ranked[0].rank, 1);
    assert_eq!(ranked[2].rank, 3);
}

#[test]
fn equal_scores_break_ties_by_sequence_index() {
    let search = SearchConfig::default();
    let ranked = rank_hits(
        "query",
        vec![
            hit("later", 7, 0.5, "a"),
            hit("earlier", 2, 0.5, "b"),
        ],
        &search,
    );

    assert_eq!(ranked[0].chunk_id, "earlier");
    assert_eq!(ranked[1].chunk_id, "later");
}

#[test]
fn ranking_is_deterministic_across_runs() {
    let search = SearchConfig::default();
    let hits = || {
        vec![
            hit("a", 3, 0.5, "x"),
            hit("b", 1, 0.5, "y"),
            hit("c", 2, 0.8, "z"),
        ]
    };

    let first = rank_hits("query", hits(), &search);
    let second = rank_hits("query", hits(), &search);
    let first_ids: Vec<&str> = first.iter().map(|c| c.chunk_id.as_str()).collect();
    let second_ids: Vec<&str> = second.iter().map(|c| c.chunk_id.as_str()).collect();
    assert_eq!(first_ids, second_ids);
    assert_eq!(first_ids, vec!["c", "b", "a"]);
}

#[test]
fn lexical_boost_rewards_term_overlap() {
    let search = SearchConfig {
        lexical_boost: 0.2,
        ..SearchConfig::default()
    };
    let ranked = rank_hits(
        "rust memory safety",
        vec![
            hit("plain", 0, 0.60, "nothing relevant here"),
            hit("matching", 1, 0.55, "Rust enforces memory safety at compile time"),
        ],
        &search,
    );

    // 0.55 + 0.2 * (3/3 terms) = 0.75 outranks 0.60.
    assert_eq!(ranked[0].chunk_id, "matching");
    assert!((ranked[0].score - 0.75).abs() < 1e-6);
    assert!((ranked[1].score - 0.60).abs() < 1e-6);
}

#[test]
fn zero_boost_leaves_scores_untouched() {
    let search = SearchConfig::default();
    let ranked = rank_hits(
        "rust",
        vec![hit("only", 0, 0.42, "rust rust rust")],
        &search,
    );
    assert!((ranked[0].score - 0.42).abs() < 1e-6);
    assert!((ranked[0].similarity_score - 0.42).abs() < 1e-6);
}

#[test]
fn preview_truncates_to_200_chars() {
    let long = "x".repeat(500);
    let search = SearchConfig::default();
    let ranked = rank_hits("query", vec![hit("long", 0, 0.5, &long)], &search);
    assert_eq!(ranked[0].preview().chars().count(), 200);

    let short = rank_hits("query", vec![hit("short", 0, 0.5, "tiny")], &search);
    assert_eq!(short[0].preview(), "tiny");
}
