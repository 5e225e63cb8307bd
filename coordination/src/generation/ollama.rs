//! Ollama `/api/generate` backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::prompt::render_prompt;
use super::{GenerationError, GenerationRequest, GenerationResult, TextGenerationService};

/// Default Ollama endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Configuration for the Ollama backend
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL, without the `/api/generate` suffix
    pub base_url: String,
    /// Per-call HTTP timeout
    pub timeout: Duration,
    /// Ask Ollama to skip its prompt template
    pub raw: bool,
}

#[derive(Debug, Serialize)]
struct GeneratePayload<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    raw: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Non-streaming client for a local or remote Ollama server.
pub struct OllamaBackend {
    client: reqwest::Client,
    endpoint: String,
    raw: bool,
}

impl OllamaBackend {
    pub fn new(config: OllamaConfig) -> GenerationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", config.base_url.trim_end_matches('/')),
            raw: config.raw,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TextGenerationService for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, request: &GenerationRequest) -> GenerationResult<String> {
        let start = Instant::now();
        let payload = GeneratePayload {
            model: &request.model,
            prompt: render_prompt(request),
            stream: false,
            raw: self.raw,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status, body });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))?;

        debug!(
            agent_id = %request.agent_id,
            model = %request.model,
            latency_ms = start.elapsed().as_millis() as u64,
            chars = body.response.len(),
            "Ollama completion received"
        );

        Ok(body.response.trim().to_string())
    }
}
