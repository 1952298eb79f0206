// Embedding generation module
// Talks to the local Ollama instance to turn text into vectors

pub mod ollama;

pub use ollama::EmbeddingClient;
