use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};

use crate::config::{Config, get_config_dir};
use crate::pipeline::Pipeline;
use crate::{RagError, Result};

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

async fn load_pipeline() -> Result<Pipeline> {
    let config_dir = get_config_dir()?;
    let config = Config::load(&config_dir)?;
    Pipeline::new(config).await
}

/// Index a file or directory into a new store
#[inline]
pub async fn build(path: &Path, name: Option<String>) -> Result<()> {
    let pipeline = load_pipeline().await?;

    let store_name = name.unwrap_or_else(|| {
        path.file_name()
            .map_or_else(|| "documents".to_string(), |n| n.to_string_lossy().to_string())
    });

    info!("Building store '{}' from {:?}", store_name, path);
    let bar = spinner(&format!("Indexing {}...", path.display()));

    match pipeline.build_store(path, &store_name).await {
        Ok(report) => {
            bar.finish_and_clear();
            println!("{} Store {} created", style("✓").green(), report.store_id);
            println!("  Documents indexed: {}", report.document_count);
            println!("  Chunks embedded: {}", report.chunk_count);
            Ok(())
        }
        Err(RagError::PartialBuild {
            store_id,
            document_count,
            failed,
        }) => {
            bar.finish_and_clear();
            println!(
                "{} Store {} created with {} documents, but {} could not be indexed:",
                style("⚠").yellow(),
                store_id,
                document_count,
                failed.len()
            );
            for failure in &failed {
                println!("  - {failure}");
            }
            // Partial store is committed and usable; surface the failures
            // without failing the command.
            Ok(())
        }
        Err(e) => {
            bar.finish_and_clear();
            error!("Build failed: {}", e);
            if e.is_service_unavailable() {
                println!(
                    "{} Ollama is not reachable. Start it and re-run the build.",
                    style("✗").red()
                );
            }
            Err(e)
        }
    }
}

/// Run a query against a store (or the most recent one)
#[inline]
pub async fn search(query: &str, store_id: Option<&str>) -> Result<()> {
    let pipeline = load_pipeline().await?;

    let bar = spinner("Searching...");
    let outcome = match pipeline.query(query, store_id).await {
        Ok(outcome) => {
            bar.finish_and_clear();
            outcome
        }
        Err(e) => {
            bar.finish_and_clear();
            error!("Search failed: {}", e);
            match &e {
                RagError::NoStoreAvailable => {
                    println!("No stores exist yet. Run 'docsearch build <path>' first.");
                }
                RagError::StoreNotFound(id) => {
                    println!("Store {id} does not exist. Use 'docsearch list' to see stores.");
                }
                _ if e.is_service_unavailable() => {
                    println!(
                        "{} Ollama is not reachable. Start it and re-run the search.",
                        style("✗").red()
                    );
                }
                _ => {}
            }
            return Err(e);
        }
    };

    println!("Store: {}", outcome.store_id);
    println!();
    println!("{}", style("Answer").bold());
    println!("{}", outcome.answer);
    println!();

    if outcome.ranked.is_empty() {
        println!("No chunks matched the query.");
    } else {
        println!("{}", style("Top results").bold());
        for chunk in &outcome.ranked {
            println!(
                "  {}. [{:.4}] {}: {}",
                chunk.rank,
                chunk.score,
                chunk.source_path,
                chunk.preview()
            );
        }
    }

    println!();
    println!("Report: {}", outcome.report_path.display());
    println!("Chart:  {}", outcome.chart_path.display());

    Ok(())
}

/// List all committed stores, newest first
#[inline]
pub async fn list() -> Result<()> {
    let pipeline = load_pipeline().await?;
    let stores = pipeline.list_stores().await?;

    if stores.is_empty() {
        println!("No stores yet. Use 'docsearch build <path>' to create one.");
        return Ok(());
    }

    println!("Stores ({} total):", stores.len());
    for store in &stores {
        println!(
            "  {}  {}  ({} documents, created {})",
            store.id,
            store.name,
            store.document_count,
            store.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    Ok(())
}

/// Delete a store's registry entry and vectors
#[inline]
pub async fn delete(store_id: &str) -> Result<()> {
    let pipeline = load_pipeline().await?;

    if pipeline.delete_store(store_id).await? {
        println!("{} Store {} deleted", style("✓").green(), store_id);
    } else {
        println!("Store {store_id} did not exist; nothing to delete.");
    }

    Ok(())
}

/// Show recent completed queries
#[inline]
pub async fn history(limit: i64) -> Result<()> {
    let pipeline = load_pipeline().await?;
    let entries = pipeline.search_history(limit).await?;

    if entries.is_empty() {
        println!("No completed searches yet.");
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{}  [{}]  {}",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.store_id,
            entry.query
        );
        println!("    {}", entry.ai_answer.lines().next().unwrap_or(""));
        if let Some(report) = &entry.report_path {
            println!("    report: {report}");
        }
    }

    Ok(())
}

/// Check connectivity to the database and the Ollama services
#[inline]
pub async fn status() -> Result<()> {
    let config_dir = get_config_dir()?;
    let config = Config::load(&config_dir)?;

    println!("docsearch status");
    println!("  Base directory: {}", config.base_dir.display());

    match Pipeline::new(config).await {
        Ok(pipeline) => {
            println!("  {} Databases initialized", style("✓").green());
            match pipeline.check_services() {
                Ok(()) => println!("  {} Ollama reachable", style("✓").green()),
                Err(e) => println!("  {} Ollama unavailable: {}", style("✗").red(), e),
            }
            let stores = pipeline.list_stores().await?;
            println!("  Stores: {}", stores.len());
        }
        Err(e) => {
            println!("  {} Initialization failed: {}", style("✗").red(), e);
        }
    }

    Ok(())
}
