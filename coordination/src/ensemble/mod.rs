//! Multi-agent ensemble orchestration and consensus
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  OrchestrationService                      │
//! │  • Validates the request                                   │
//! │  • Builds a fresh ModelRotator per run                     │
//! └─────────────────────────┬─────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │                  AgentOrchestrator                         │
//! │  • Genesis hash, agent origins                             │
//! │  • rounds × agents calls to TextGenerationService          │
//! │  • One Fragment per (agent, round)                         │
//! └─────────────────────────┬─────────────────────────────────┘
//!                           │ fragments
//!                           ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │                  ConsensusAssembler                        │
//! │  • Normalize → group → score → select                      │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use coordination::ensemble::{OrchestrationRequest, OrchestrationService};
//! use coordination::generation::{OllamaBackend, OllamaConfig};
//!
//! let backend = Arc::new(OllamaBackend::new(OllamaConfig {
//!     base_url: "http://localhost:11434".to_string(),
//!     timeout: Duration::from_secs(300),
//!     raw: true,
//! })?);
//! let service = OrchestrationService::new(backend, default_models())?.shared();
//!
//! let response = service.handle(&OrchestrationRequest::default()).await;
//! ```

pub mod assembler;
pub mod normalize;
pub mod orchestrator;
pub mod service;
pub mod types;

pub use assembler::{ConsensusAssembler, ScoreWeights};
pub use normalize::{CommentLineNormalizer, Normalizer};
pub use orchestrator::{AgentOrchestrator, FanOut, OrchestratorConfig, RunOutput, RunParameters};
pub use service::{
    OrchestrationError, OrchestrationFailure, OrchestrationRequest, OrchestrationResponse,
    OrchestrationResult, OrchestrationService, ServiceLimits, SharedOrchestrationService,
};
pub use types::{
    Agent, CandidateGroup, ConsensusResult, Fragment, FragmentStatus, ScoredGroup,
};
