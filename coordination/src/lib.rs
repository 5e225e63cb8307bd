//! Fractal consensus coordination library
//!
//! A fixed pool of agents repeatedly asks a text-generation backend for
//! code candidates. Every agent carries a hash-chained lineage seeded from
//! a per-run genesis digest. Candidates are grouped by normalized text and
//! scored by cross-agent agreement, cross-round persistence and the
//! entropy of the lineage hashes behind them; the best group wins.
//!
//! # Modules
//!
//! - [`lineage`]: SHA-256 hash chain, Shannon entropy, clock and nonce sources
//! - [`router`]: round-robin model rotation
//! - [`generation`]: backend trait, prompt rendering, Ollama client
//! - [`ensemble`]: orchestrator, consensus assembler, request service
//! - [`events`]: caller-visible run log

#![allow(clippy::uninlined_format_args)]

pub mod ensemble;
pub mod events;
pub mod generation;
pub mod lineage;
pub mod router;

// Re-export key ensemble types
pub use ensemble::{
    AgentOrchestrator, ConsensusAssembler, ConsensusResult, FanOut, Fragment, FragmentStatus,
    OrchestrationError, OrchestrationFailure, OrchestrationRequest, OrchestrationResponse,
    OrchestrationService, OrchestratorConfig, RunParameters, ScoreWeights, ScoredGroup,
    ServiceLimits, SharedOrchestrationService,
};

// Re-export generation boundary
pub use generation::{
    GenerationError, GenerationRequest, OllamaBackend, OllamaConfig, TextGenerationService,
};

// Re-export lineage primitives
pub use lineage::{digest, shannon_entropy, Clock, HashDigest, NonceSource};

// Re-export event types
pub use events::{LogEntry, LogKind, LogRole};

pub use router::{default_models, ModelRotator, RotatorError};
