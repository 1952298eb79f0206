
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::OllamaConfig;
use crate::{RagError, Result};

/// Client for the local Ollama embedding API.
///
/// The service is treated as a capability that is either reachable or not:
/// `ping` probes it cheaply, and every real request carries a short global
/// timeout. Unavailability is terminal for the current operation. There is
/// no retry loop, because an embedding from a wrong or absent model would
/// silently corrupt the index. The caller decides whether to resubmit.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    base_url: Url,
    model: String,
    batch_size: u32,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    model: String,
    #[serde(rename = "input")]
    inputs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl EmbeddingClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .map_err(|e| RagError::Config(e.to_string()))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.embedding_model.clone(),
            batch_size: config.batch_size,
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    /// The model id every vector from this client is tagged with.
    #[inline]
    pub fn model_id(&self) -> &str {
        &self.model
    }

    /// Probe the Ollama server. Fails with
    /// [`RagError::EmbeddingServiceUnavailable`] when it cannot be reached
    /// within the configured timeout.
    #[inline]
    pub fn ping(&self) -> Result<()> {
        let url = self
            .base_url
            .join("/api/tags")
            .map_err(|e| RagError::Config(e.to_string()))?;

        debug!("Pinging embedding service at {}", url);

        self.agent
            .get(url.as_str())
            .call()
            .map_err(|e| RagError::EmbeddingServiceUnavailable(e.to_string()))?;

        debug!("Embedding service ping successful");
        Ok(())
    }

    /// Generate an embedding for a single text input.
    #[inline]
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        let request = EmbedRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response_text = self.post_json("/api/embed", &request)?;

        let embed_response: EmbedResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::EmbeddingRequest(format!("malformed response: {}", e)))?;

        if embed_response.embedding.is_empty() {
            return Err(RagError::EmbeddingRequest(
                "service returned an empty vector".to_string(),
            ));
        }

        Ok(embed_response.embedding)
    }

    /// Generate embeddings for multiple texts, preserving input order.
    #[inline]
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size as usize) {
            results.extend(self.embed_single_batch(batch)?);
        }

        debug!("Generated {} embeddings total", results.len());
        Ok(results)
    }

    fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if let [text] = texts {
            return Ok(vec![self.embed(text)?]);
        }

        let request = BatchEmbedRequest {
            model: self.model.clone(),
            inputs: texts.to_vec(),
        };

        let response_text = self.post_json("/api/embed", &request)?;

        let batch_response: BatchEmbedResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::EmbeddingRequest(format!("malformed response: {}", e)))?;

        if batch_response.embeddings.len() != texts.len() {
            return Err(RagError::EmbeddingRequest(format!(
                "mismatch between request and response counts: {} vs {}",
                texts.len(),
                batch_response.embeddings.len()
            )));
        }

        Ok(batch_response.embeddings)
    }

    fn post_json<T: Serialize>(&self, path: &str, request: &T) -> Result<String> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| RagError::Config(e.to_string()))?;

        let request_json = serde_json::to_string(request)
            .map_err(|e| RagError::EmbeddingRequest(e.to_string()))?;

        self.agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| RagError::EmbeddingServiceUnavailable(e.to_string()))
    }
}
