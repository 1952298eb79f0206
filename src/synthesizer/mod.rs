#[cfg(test)]
mod tests;

use crate::Result;
use crate::generation::GenerationClient;
use crate::ranker::RankedChunk;
use chrono::Utc;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Result of answer synthesis: the generated answer plus the two HTML
/// artifacts written for this query.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub answer: String,
    pub report_path: PathBuf,
    pub chart_path: PathBuf,
}

/// Turns a ranked result list into a natural-language answer.
///
/// The prompt includes the query and as many top-ranked chunks as fit the
/// byte budget; the query itself is never dropped. Alongside the answer,
/// two HTML artifacts land in the artifacts directory: a report of the
/// ranked results and a bar chart of their relevance scores.
pub struct Synthesizer<'a> {
    generation: &'a GenerationClient,
    artifacts_dir: PathBuf,
    context_budget_bytes: usize,
}

impl<'a> Synthesizer<'a> {
    #[inline]
    pub fn new(
        generation: &'a GenerationClient,
        artifacts_dir: PathBuf,
        context_budget_bytes: usize,
    ) -> Self {
        Self {
            generation,
            artifacts_dir,
            context_budget_bytes,
        }
    }

    /// Generate an answer for `query` grounded in `ranked`, writing the
    /// report and chart artifacts as a side effect.
    #[inline]
    pub fn synthesize(&self, query: &str, ranked: &[RankedChunk]) -> Result<Synthesis> {
        let prompt = build_prompt(query, ranked, self.context_budget_bytes);
        debug!("Synthesizing answer ({} byte prompt)", prompt.len());

        let answer = self.generation.generate(&prompt)?;

        std::fs::create_dir_all(&self.artifacts_dir)?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let report_path = self.artifacts_dir.join(format!("search_{stamp}.html"));
        let chart_path = self.artifacts_dir.join(format!("chart_{stamp}.html"));

        std::fs::write(&report_path, render_report(query, &answer, ranked))?;
        std::fs::write(&chart_path, render_chart(query, ranked))?;
        info!("Wrote report {:?} and chart {:?}", report_path, chart_path);

        Ok(Synthesis {
            answer,
            report_path,
            chart_path,
        })
    }

    #[inline]
    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }
}

/// Assemble the generation prompt within `budget_bytes`.
///
/// Chunks are taken in rank order and a chunk is only included whole; the
/// first chunk that would overflow the budget stops the fill. The query is
/// always present even when it alone exceeds the budget.
fn build_prompt(query: &str, ranked: &[RankedChunk], budget_bytes: usize) -> String {
    let header = "Answer the question using only the context below. \
If the context does not contain the answer, say so.\n\nContext:\n";
    let footer = format!("\nQuestion: {query}\nAnswer:");

    let mut sections: Vec<String> = Vec::new();
    let mut used = header.len() + footer.len();
    for chunk in ranked {
        let section = format!(
            "[{}] (from {})\n{}\n",
            chunk.rank, chunk.source_path, chunk.content
        );
        if used + section.len() > budget_bytes {
            debug!(
                "Context budget reached after {} of {} chunks",
                sections.len(),
                ranked.len()
            );
            break;
        }
        used += section.len();
        sections.push(section);
    }

    if sections.is_empty() {
        sections.push("(no relevant context found)\n".to_string());
    }

    format!("{header}{}{footer}", sections.join("\n"))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_report(query: &str, answer: &str, ranked: &[RankedChunk]) -> String {
    let mut rows = String::new();
    for chunk in ranked {
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{:.4}</td><td>{}</td></tr>\n",
            chunk.rank,
            escape_html(&chunk.source_path),
            chunk.score,
            escape_html(&chunk.preview()),
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Search report</title>
<style>
body {{ font-family: sans-serif; margin: 2em; }}
table {{ border-collapse: collapse; width: 100%; }}
td, th {{ border: 1px solid #ccc; padding: 0.4em 0.8em; text-align: left; }}
blockquote {{ background: #f5f5f5; padding: 1em; }}
</style>
</head>
<body>
<h1>Search report</h1>
<p><strong>Query:</strong> {}</p>
<h2>Answer</h2>
<blockquote>{}</blockquote>
<h2>Ranked results</h2>
<table>
<tr><th>Rank</th><th>Source</th><th>Score</th><th>Preview</th></tr>
{}</table>
</body>
</html>
"#,
        escape_html(query),
        escape_html(answer),
        rows
    )
}

/// A self-contained horizontal bar chart of relevance scores. The original
/// system produced Plotly files for this; plain CSS bars avoid shipping a
/// JavaScript bundle per query.
fn render_chart(query: &str, ranked: &[RankedChunk]) -> String {
    let mut bars = String::new();
    for chunk in ranked {
        let width = (chunk.score.clamp(0.0, 1.0) * 100.0).round();
        let _ = write!(
            bars,
            "<div class=\"row\"><span class=\"label\">#{} {}</span>\
<div class=\"bar\" style=\"width: {width}%\"></div>\
<span class=\"value\">{:.4}</span></div>\n",
            chunk.rank,
            escape_html(&chunk.source_path),
            chunk.score,
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Relevance scores</title>
<style>
body {{ font-family: sans-serif; margin: 2em; }}
.row {{ display: flex; align-items: center; margin: 0.3em 0; }}
.label {{ width: 20em; overflow: hidden; text-overflow: ellipsis; white-space: nowrap; }}
.bar {{ height: 1em; background: #4a90d9; margin-right: 0.5em; }}
.value {{ font-variant-numeric: tabular-nums; }}
</style>
</head>
<body>
<h1>Relevance scores</h1>
<p><strong>Query:</strong> {}</p>
{}</body>
</html>
"#,
        escape_html(query),
        bars
    )
}
