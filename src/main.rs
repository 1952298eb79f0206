use clap::{Parser, Subcommand};
use docsearch::Result;
use docsearch::commands::{build, delete, history, list, search, status};
use docsearch::config::{Config, get_config_dir, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docsearch")]
#[command(about = "Index local documents and search them with a local language model")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Index a file or directory into a new store
    Build {
        /// File or directory to index
        path: PathBuf,
        /// Optional name for the store
        #[arg(long)]
        name: Option<String>,
    },
    /// Ask a question against an indexed store
    Search {
        /// The question to answer
        query: String,
        /// Store id to search; defaults to the most recent store
        #[arg(long)]
        store: Option<String>,
    },
    /// List all indexed stores
    List,
    /// Delete a store and its vectors
    Delete {
        /// Store id to delete
        store: String,
    },
    /// Show recent searches and their answers
    History {
        /// Maximum number of entries to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Check database and Ollama connectivity
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            let config = Config::load(get_config_dir()?)?;
            if show {
                show_config(&config)?;
            } else {
                run_interactive_config(config)?;
            }
        }
        Commands::Build { path, name } => {
            build(&path, name).await?;
        }
        Commands::Search { query, store } => {
            search(&query, store.as_deref()).await?;
        }
        Commands::List => {
            list().await?;
        }
        Commands::Delete { store } => {
            delete(&store).await?;
        }
        Commands::History { limit } => {
            history(limit).await?;
        }
        Commands::Status => {
            status().await?;
        }
    }

    Ok(())
}
