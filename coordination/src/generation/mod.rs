//! Generation backend boundary
//!
//! Agents never talk to a model directly. Every call goes through
//! [`TextGenerationService`], a request/response seam that returns raw
//! candidate text or a [`GenerationError`]. Failures are recoverable: the
//! orchestrator turns them into degraded fragments and keeps going.

pub mod ollama;
pub mod prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::lineage::HashDigest;

pub use ollama::{OllamaBackend, OllamaConfig};
pub use prompt::{comment_marker, render_candidate, render_failure, render_prompt};

/// Error type for a single generation call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response parse error: {0}")]
    Decode(String),

    #[error("Run deadline exceeded")]
    DeadlineExceeded,
}

/// Result type for generation calls
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Everything a backend needs to produce one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub agent_id: String,
    pub model: String,
    pub prompt: String,
    pub context: String,
    /// Zero-based round index
    pub round: u32,
    /// Agent origin before this round's advance
    pub origin: HashDigest,
    pub file_type: String,
    pub reasoning_depth: u32,
}

/// Text generation backend used by the orchestrator.
#[async_trait]
pub trait TextGenerationService: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Produce raw candidate text for one agent call.
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult<String>;
}
