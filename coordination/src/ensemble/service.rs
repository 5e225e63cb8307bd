//! Request-level entry point: validation, one orchestrated run, consensus.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::assembler::{ConsensusAssembler, ScoreWeights};
use super::normalize::CommentLineNormalizer;
use super::orchestrator::{AgentOrchestrator, OrchestratorConfig, RunParameters};
use super::types::ConsensusResult;
use crate::events::{LogEntry, LogKind, LogRole, RunLog};
use crate::generation::TextGenerationService;
use crate::lineage::{Clock, NonceSource, OsNonce, SystemClock};
use crate::router::{ModelRotator, RotatorError};

/// Error type for structural failures of a request
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrchestrationError {
    #[error("Invalid request body: {0}")]
    InvalidRequest(String),

    #[error("Invalid parameter {field}: {reason}")]
    InvalidParameter { field: &'static str, reason: String },

    #[error("Model rotation unavailable: {0}")]
    Rotator(#[from] RotatorError),
}

impl OrchestrationError {
    /// Whether the caller is at fault (as opposed to the service).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_) | Self::InvalidParameter { .. }
        )
    }
}

/// Result type for orchestration requests
pub type OrchestrationResult<T> = Result<T, OrchestrationError>;

/// A failed request together with the log collected before the failure.
#[derive(Debug, Clone)]
pub struct OrchestrationFailure {
    pub error: OrchestrationError,
    pub log: Vec<LogEntry>,
}

impl OrchestrationFailure {
    fn new(error: OrchestrationError, log: RunLog) -> Self {
        error!(error = %error, "Orchestration failed");
        let mut log = log;
        log.push(
            LogRole::Nexus,
            LogKind::Error,
            format!("Critical Server Error: {error}"),
        );
        Self {
            error,
            log: log.into_entries(),
        }
    }

    pub fn into_response(self) -> OrchestrationResponse {
        OrchestrationResponse::Error {
            message: self.error.to_string(),
            log: self.log,
        }
    }
}

/// Body of an orchestration request. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestrationRequest {
    pub code_context: String,
    pub prompt: String,
    // Signed so that negative values reach validation instead of failing decode.
    pub agent_count: i64,
    pub max_rounds: i64,
    pub reasoning_depth: i64,
    pub file_type: String,
}

impl Default for OrchestrationRequest {
    fn default() -> Self {
        Self {
            code_context: String::new(),
            prompt: "Optimize this code".to_string(),
            agent_count: 5,
            max_rounds: 3,
            reasoning_depth: 3,
            file_type: "javascript".to_string(),
        }
    }
}

impl OrchestrationRequest {
    /// Decode a JSON body; an empty body means all defaults.
    pub fn from_json(body: &[u8]) -> OrchestrationResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| OrchestrationError::InvalidRequest(e.to_string()))
    }

    /// Check parameters against the service limits.
    pub fn validate(&self, limits: &ServiceLimits) -> OrchestrationResult<RunParameters> {
        let agent_count = bounded("agentCount", self.agent_count, limits.max_agents as i64)?;
        let max_rounds = bounded("maxRounds", self.max_rounds, limits.max_rounds as i64)?;
        let reasoning_depth = bounded("reasoningDepth", self.reasoning_depth, u32::MAX as i64)?;

        if self.file_type.trim().is_empty() {
            return Err(OrchestrationError::InvalidParameter {
                field: "fileType",
                reason: "must not be blank".to_string(),
            });
        }

        Ok(RunParameters {
            context: self.code_context.clone(),
            prompt: self.prompt.clone(),
            agent_count: agent_count as usize,
            max_rounds: max_rounds as u32,
            reasoning_depth: reasoning_depth as u32,
            file_type: self.file_type.trim().to_string(),
        })
    }
}

fn bounded(field: &'static str, value: i64, max: i64) -> OrchestrationResult<i64> {
    if (1..=max).contains(&value) {
        Ok(value)
    } else {
        Err(OrchestrationError::InvalidParameter {
            field,
            reason: format!("{value} is outside 1..={max}"),
        })
    }
}

/// Response body, tagged by `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrchestrationResponse {
    Success {
        log: Vec<LogEntry>,
        consensus: ConsensusResult,
    },
    Error {
        message: String,
        log: Vec<LogEntry>,
    },
}

/// Upper bounds on request parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceLimits {
    pub max_agents: usize,
    pub max_rounds: u32,
}

impl Default for ServiceLimits {
    fn default() -> Self {
        Self {
            max_agents: 32,
            max_rounds: 16,
        }
    }
}

/// Shared reference to OrchestrationService
pub type SharedOrchestrationService = Arc<OrchestrationService>;

/// Runs one orchestration per request against a shared backend.
pub struct OrchestrationService {
    backend: Arc<dyn TextGenerationService>,
    models: Vec<String>,
    config: OrchestratorConfig,
    limits: ServiceLimits,
    weights: ScoreWeights,
    nonce: Arc<dyn NonceSource>,
    clock: Arc<dyn Clock>,
}

impl OrchestrationService {
    /// Fails if `models` could not drive a rotator.
    pub fn new(
        backend: Arc<dyn TextGenerationService>,
        models: Vec<String>,
    ) -> OrchestrationResult<Self> {
        ModelRotator::new(models.clone())?;
        Ok(Self {
            backend,
            models,
            config: OrchestratorConfig::default(),
            limits: ServiceLimits::default(),
            weights: ScoreWeights::default(),
            nonce: Arc::new(OsNonce),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_limits(mut self, limits: ServiceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_nonce_source(mut self, nonce: Arc<dyn NonceSource>) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Create a shared reference to this service
    pub fn shared(self) -> SharedOrchestrationService {
        Arc::new(self)
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn limits(&self) -> &ServiceLimits {
        &self.limits
    }

    /// Run one request end to end.
    pub async fn handle(
        &self,
        request: &OrchestrationRequest,
    ) -> Result<OrchestrationResponse, OrchestrationFailure> {
        let mut log = RunLog::new();

        let params = match request.validate(&self.limits) {
            Ok(params) => params,
            Err(e) => return Err(OrchestrationFailure::new(e, log)),
        };

        // Fresh rotator per run so concurrent requests never share a counter.
        let rotator = match ModelRotator::new(self.models.clone()) {
            Ok(rotator) => rotator,
            Err(e) => return Err(OrchestrationFailure::new(e.into(), log)),
        };

        let orchestrator = AgentOrchestrator::new(Arc::clone(&self.backend), rotator)
            .with_config(self.config.clone())
            .with_nonce_source(Arc::clone(&self.nonce))
            .with_clock(Arc::clone(&self.clock));

        let output = orchestrator.run(&params).await;
        log.extend(output.log);
        log.push(
            LogRole::Sentinel,
            LogKind::Info,
            "Assembling final consensus...",
        );

        let assembler = ConsensusAssembler::new(Box::new(CommentLineNormalizer::for_file_type(
            &params.file_type,
        )))
        .with_weights(self.weights);
        let consensus = assembler.assemble(&output.fragments, &output.genesis);

        info!(
            genesis = %consensus.genesis.short(16),
            score = consensus.score,
            groups = consensus.all_groups.len(),
            "Request complete"
        );

        Ok(OrchestrationResponse::Success {
            log: log.into_entries(),
            consensus,
        })
    }

    /// Decode a raw JSON body and run it; failures come back as the error
    /// response shape.
    pub async fn handle_json(
        &self,
        body: &[u8],
    ) -> Result<OrchestrationResponse, OrchestrationFailure> {
        let request = OrchestrationRequest::from_json(body)
            .map_err(|e| OrchestrationFailure::new(e, RunLog::new()))?;
        self.handle(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = OrchestrationRequest::from_json(b"{}").unwrap();
        assert_eq!(request, OrchestrationRequest::default());
        assert_eq!(request.prompt, "Optimize this code");
        assert_eq!(request.agent_count, 5);
        assert_eq!(request.max_rounds, 3);
        assert_eq!(request.reasoning_depth, 3);
        assert_eq!(request.file_type, "javascript");
        assert_eq!(OrchestrationRequest::from_json(b"  ").unwrap(), request);
    }

    #[test]
    fn test_request_camel_case_fields() {
        let request = OrchestrationRequest::from_json(
            br#"{"codeContext":"x","agentCount":2,"maxRounds":1,"fileType":"python"}"#,
        )
        .unwrap();
        assert_eq!(request.code_context, "x");
        assert_eq!(request.agent_count, 2);
        assert_eq!(request.max_rounds, 1);
        assert_eq!(request.file_type, "python");
        assert_eq!(request.reasoning_depth, 3);
    }

    #[test]
    fn test_malformed_body() {
        let err = OrchestrationRequest::from_json(br#"{"agentCount":"many"}"#).unwrap_err();
        assert!(matches!(err, OrchestrationError::InvalidRequest(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_validation_bounds() {
        let limits = ServiceLimits::default();
        let mut request = OrchestrationRequest {
            agent_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            request.validate(&limits),
            Err(OrchestrationError::InvalidParameter { field: "agentCount", .. })
        ));

        request.agent_count = 2;
        request.max_rounds = -1;
        assert!(matches!(
            request.validate(&limits),
            Err(OrchestrationError::InvalidParameter { field: "maxRounds", .. })
        ));

        request.max_rounds = 17;
        assert!(request.validate(&limits).is_err());

        request.max_rounds = 16;
        request.file_type = "  ".to_string();
        assert!(matches!(
            request.validate(&limits),
            Err(OrchestrationError::InvalidParameter { field: "fileType", .. })
        ));

        request.file_type = "rust".to_string();
        let params = request.validate(&limits).unwrap();
        assert_eq!(params.agent_count, 2);
        assert_eq!(params.max_rounds, 16);
    }

    #[test]
    fn test_failure_adds_diagnostic_entry() {
        let failure = OrchestrationFailure::new(
            OrchestrationError::InvalidRequest("bad".to_string()),
            RunLog::new(),
        );
        assert_eq!(failure.log.len(), 1);
        assert_eq!(failure.log[0].agent, LogRole::Nexus);
        assert_eq!(failure.log[0].kind, LogKind::Error);
        assert_eq!(
            failure.log[0].message,
            "Critical Server Error: Invalid request body: bad"
        );

        let json = serde_json::to_value(failure.into_response()).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "Invalid request body: bad");
        assert_eq!(json["log"].as_array().unwrap().len(), 1);
    }
}
