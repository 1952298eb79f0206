#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::OllamaConfig;
use crate::{RagError, Result};

/// Client for the local Ollama generation API.
///
/// Same contract as the embedding client: explicit reachability check, short
/// timeout, and no retries. Unavailability is surfaced to the caller, who
/// starts the service and resubmits.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    base_url: Url,
    model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl GenerationClient {
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
            model: config.generation_model.clone(),
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

    #[inline]
    pub fn model_id(&self) -> &str {
        &self.model
    }

    /// Probe the generation service.
    #[inline]
    pub fn ping(&self) -> Result<()> {
        let url = self
            .base_url
            .join("/api/tags")
            .map_err(|e| RagError::Config(e.to_string()))?;

        debug!("Pinging generation service at {}", url);

        self.agent
            .get(url.as_str())
            .call()
            .map_err(|e| RagError::GenerationServiceUnavailable(e.to_string()))?;

        Ok(())
    }

    /// Run a single non-streaming completion for the given prompt.
    #[inline]
    pub fn generate(&self, prompt: &str) -> Result<String> {
        debug!("Generating answer for prompt (length: {})", prompt.len());

        let url = self
            .base_url
            .join("/api/generate")
            .map_err(|e| RagError::Config(e.to_string()))?;

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let request_json = serde_json::to_string(&request)
            .map_err(|e| RagError::GenerationServiceUnavailable(e.to_string()))?;

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| RagError::GenerationServiceUnavailable(e.to_string()))?;

        let response: GenerateResponse = serde_json::from_str(&response_text).map_err(|e| {
            RagError::GenerationServiceUnavailable(format!("malformed response: {}", e))
        })?;

        debug!("Generated answer ({} chars)", response.response.len());
        Ok(response.response)
    }
}
