use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, ConfigError, OllamaConfig};
use crate::embeddings::ollama::EmbeddingClient;

#[inline]
pub fn run_interactive_config(mut config: Config) -> Result<()> {
    eprintln!("{}", style("Docsearch Configuration Setup").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Ollama Configuration").bold().yellow());
    eprintln!("Configure the local Ollama instance used for embeddings and answers.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;
    configure_chunking(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.ollama) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before indexing.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    eprintln!("{}", style("Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    eprintln!("  Host: {}", style(&config.ollama.host).cyan());
    eprintln!("  Port: {}", style(config.ollama.port).cyan());
    eprintln!(
        "  Embedding Model: {}",
        style(&config.ollama.embedding_model).cyan()
    );
    eprintln!(
        "  Generation Model: {}",
        style(&config.ollama.generation_model).cyan()
    );
    eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());
    eprintln!("  Timeout: {}s", style(config.ollama.timeout_secs).cyan());

    eprintln!();
    eprintln!("{}", style("Chunking:").bold().yellow());
    eprintln!(
        "  Window: {} chars, overlap {}",
        style(config.chunking.max_chunk_size).cyan(),
        style(config.chunking.overlap_size).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Search:").bold().yellow());
    eprintln!("  Top K: {}", style(config.search.top_k).cyan());
    eprintln!(
        "  Similarity Floor: {}",
        style(config.search.similarity_floor).cyan()
    );
    eprintln!(
        "  Context Budget: {} bytes",
        style(config.search.context_budget_bytes).cyan()
    );

    eprintln!();
    match config.ollama.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;
    ollama.protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .interact_text()?;
    ollama.set_host(host).context("Invalid host")?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), ConfigError> {
            if *input == 0 {
                Err(ConfigError::InvalidPort(*input))
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    ollama.set_port(port).context("Invalid port")?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.embedding_model.clone())
        .interact_text()?;
    ollama
        .set_embedding_model(embedding_model)
        .context("Invalid embedding model")?;

    let generation_model: String = Input::new()
        .with_prompt("Generation model")
        .default(ollama.generation_model.clone())
        .interact_text()?;
    ollama
        .set_generation_model(generation_model)
        .context("Invalid generation model")?;

    let batch_size: u32 = Input::new()
        .with_prompt("Embedding batch size")
        .default(ollama.batch_size)
        .interact_text()?;
    ollama
        .set_batch_size(batch_size)
        .context("Invalid batch size")?;

    Ok(())
}

fn configure_chunking(config: &mut Config) -> Result<()> {
    eprintln!();
    eprintln!("{}", style("Chunking Configuration").bold().yellow());

    let max_chunk_size: usize = Input::new()
        .with_prompt("Chunk window size (chars)")
        .default(config.chunking.max_chunk_size)
        .interact_text()?;

    let overlap_size: usize = Input::new()
        .with_prompt("Chunk overlap (chars)")
        .default(config.chunking.overlap_size)
        .validate_with(|input: &usize| -> Result<(), String> {
            if *input >= max_chunk_size {
                Err(format!("overlap must be smaller than {}", max_chunk_size))
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    config.chunking.max_chunk_size = max_chunk_size;
    config.chunking.overlap_size = overlap_size;

    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    match EmbeddingClient::new(ollama) {
        Ok(client) => client.ping().is_ok(),
        Err(_) => false,
    }
}
