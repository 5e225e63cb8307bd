//! Agent orchestrator - drives the rounds × agents generation schedule
//!
//! Rounds run strictly one after another because every agent's origin for
//! round `r + 1` is derived from its origin in round `r`. Within a round the
//! agents are independent, so their generation calls may be in flight
//! together. Models are drawn from the rotator in agent order before any
//! call is issued and results are collected by agent slot, which keeps a
//! run reproducible regardless of completion order.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::types::{Agent, Fragment, FragmentStatus};
use crate::events::{LogEntry, LogKind, LogRole, RunLog};
use crate::generation::{
    comment_marker, render_candidate, render_failure, GenerationError, GenerationRequest,
    GenerationResult, TextGenerationService,
};
use crate::lineage::{
    advance_origin, agent_origin, genesis_hash, shannon_entropy, Clock, HashDigest, NonceSource,
    OsNonce, SystemClock,
};
use crate::router::ModelRotator;

/// How the calls of one round are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanOut {
    /// One call at a time, in agent order
    Sequential,
    /// All calls of the round in flight together
    #[default]
    Concurrent,
}

impl std::str::FromStr for FanOut {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "concurrent" => Ok(Self::Concurrent),
            other => Err(format!("unknown fan-out mode: {other}")),
        }
    }
}

/// Orchestrator settings that do not vary per request
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    pub fan_out: FanOut,
    /// Overall budget for the whole run; `None` waits indefinitely
    pub deadline: Option<Duration>,
}

/// Per-request run parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RunParameters {
    pub context: String,
    pub prompt: String,
    pub agent_count: usize,
    pub max_rounds: u32,
    pub reasoning_depth: u32,
    pub file_type: String,
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub genesis: HashDigest,
    /// One fragment per (agent, round), round-major then agent order
    pub fragments: Vec<Fragment>,
    pub log: Vec<LogEntry>,
    /// Rounds that were started before the deadline (all of them without one)
    pub rounds_run: u32,
    pub deadline_hit: bool,
}

/// Runs a fixed pool of agents against a generation backend.
pub struct AgentOrchestrator {
    service: Arc<dyn TextGenerationService>,
    rotator: ModelRotator,
    nonce: Arc<dyn NonceSource>,
    clock: Arc<dyn Clock>,
    config: OrchestratorConfig,
}

impl AgentOrchestrator {
    pub fn new(service: Arc<dyn TextGenerationService>, rotator: ModelRotator) -> Self {
        Self {
            service,
            rotator,
            nonce: Arc::new(OsNonce),
            clock: Arc::new(SystemClock),
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
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

    pub fn rotator(&self) -> &ModelRotator {
        &self.rotator
    }

    /// Create the agents of a run, each with its own nonce-seeded origin.
    pub fn spawn_agents(&self, genesis: &HashDigest, count: usize) -> Vec<Agent> {
        (0..count)
            .map(|index| {
                let id = Agent::id_for(index);
                let origin = agent_origin(genesis, &id, self.nonce.next_nonce());
                Agent { id, origin }
            })
            .collect()
    }

    /// Execute every round and collect the fragments.
    pub async fn run(&self, params: &RunParameters) -> RunOutput {
        let mut log = RunLog::new();
        let genesis = genesis_hash(&self.clock.timestamp(), &params.context);
        let marker = comment_marker(&params.file_type);

        info!(
            genesis = %genesis.short(16),
            agents = params.agent_count,
            rounds = params.max_rounds,
            backend = self.service.name(),
            fan_out = ?self.config.fan_out,
            "Orchestration started"
        );
        log.push(
            LogRole::Nexus,
            LogKind::Genesis,
            format!("Genesis Hash: {}...", genesis.short(16)),
        );
        log.push(
            LogRole::Nexus,
            LogKind::Info,
            format!(
                "Orchestrating {} agents for {} rounds.",
                params.agent_count, params.max_rounds
            ),
        );

        let mut agents = self.spawn_agents(&genesis, params.agent_count);
        let mut fragments = Vec::with_capacity(params.agent_count * params.max_rounds as usize);
        // A budget past the end of the clock's range means no deadline.
        let deadline = self
            .config
            .deadline
            .and_then(|budget| Instant::now().checked_add(budget));
        let mut rounds_run = 0;
        let mut deadline_hit = false;

        for round in 0..params.max_rounds {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                deadline_hit = true;
                break;
            }

            log.push(
                LogRole::Relay,
                LogKind::Info,
                format!("Starting Round {}/{}...", round + 1, params.max_rounds),
            );

            // Draw models in agent order before anything is in flight.
            let requests: Vec<GenerationRequest> = agents
                .iter()
                .map(|agent| GenerationRequest {
                    agent_id: agent.id.clone(),
                    model: self.rotator.next().to_string(),
                    prompt: params.prompt.clone(),
                    context: params.context.clone(),
                    round,
                    origin: agent.origin.clone(),
                    file_type: params.file_type.clone(),
                    reasoning_depth: params.reasoning_depth,
                })
                .collect();

            let outcomes = self.dispatch(&requests, deadline).await;

            for ((agent, request), outcome) in agents.iter_mut().zip(&requests).zip(outcomes) {
                let (candidate, status) = match outcome {
                    Ok(code) => (
                        render_candidate(
                            marker,
                            &agent.id,
                            &request.model,
                            round,
                            &request.origin,
                            &code,
                        ),
                        FragmentStatus::Generated,
                    ),
                    Err(e) => {
                        if e == GenerationError::DeadlineExceeded {
                            deadline_hit = true;
                        }
                        warn!(
                            agent_id = %agent.id,
                            model = %request.model,
                            round,
                            error = %e,
                            "Generation failed"
                        );
                        log.push(
                            LogRole::Relay,
                            LogKind::Warning,
                            format!("Generation failed for agent {}: {}", agent.id, e),
                        );
                        (
                            render_failure(marker, &agent.id, round, &e.to_string()),
                            FragmentStatus::Failed,
                        )
                    }
                };

                agent.origin = advance_origin(&agent.origin, &genesis, round);
                let entropy = shannon_entropy(agent.origin.as_str());

                debug!(agent_id = %agent.id, round, entropy, ?status, "Fragment recorded");
                log.push(
                    LogRole::Sentinel,
                    LogKind::Fragment,
                    format!(
                        "Fragment from {} (Model: {}) - Entropy: {}",
                        agent.id, request.model, entropy
                    ),
                );

                fragments.push(Fragment {
                    agent_id: agent.id.clone(),
                    origin: agent.origin.clone(),
                    round,
                    candidate,
                    entropy,
                    model: request.model.clone(),
                    status,
                });
            }

            rounds_run += 1;
        }

        if deadline_hit {
            warn!(rounds_run, rounds = params.max_rounds, "Run deadline reached");
            log.push(
                LogRole::Relay,
                LogKind::Warning,
                format!(
                    "Run deadline reached after {}/{} rounds; continuing with partial results.",
                    rounds_run, params.max_rounds
                ),
            );
        }

        info!(
            fragments = fragments.len(),
            failed = fragments.iter().filter(|f| f.is_failed()).count(),
            rounds_run,
            "Orchestration finished"
        );

        RunOutput {
            genesis,
            fragments,
            log: log.into_entries(),
            rounds_run,
            deadline_hit,
        }
    }

    /// Issue the calls of one round; results come back in request order.
    async fn dispatch(
        &self,
        requests: &[GenerationRequest],
        deadline: Option<Instant>,
    ) -> Vec<GenerationResult<String>> {
        match self.config.fan_out {
            FanOut::Concurrent => join_all(requests.iter().map(|r| self.call(r, deadline))).await,
            FanOut::Sequential => {
                let mut outcomes = Vec::with_capacity(requests.len());
                for request in requests {
                    outcomes.push(self.call(request, deadline).await);
                }
                outcomes
            }
        }
    }

    async fn call(
        &self,
        request: &GenerationRequest,
        deadline: Option<Instant>,
    ) -> GenerationResult<String> {
        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, self.service.generate(request))
                .await
                .unwrap_or(Err(GenerationError::DeadlineExceeded)),
            None => self.service.generate(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineage::{FixedClock, SeededNonce};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    /// Echoes a fixed snippet and records the models it was asked for.
    struct RecordingService {
        calls: Mutex<Vec<(String, u32, String)>>,
    }

    impl RecordingService {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerationService for RecordingService {
        fn name(&self) -> &str {
            "recording"
        }

        async fn generate(&self, request: &GenerationRequest) -> GenerationResult<String> {
            self.calls.lock().unwrap().push((
                request.agent_id.clone(),
                request.round,
                request.model.clone(),
            ));
            Ok("x=1".to_string())
        }
    }

    fn params(agents: usize, rounds: u32) -> RunParameters {
        RunParameters {
            context: "let x = 0;".to_string(),
            prompt: "Optimize this code".to_string(),
            agent_count: agents,
            max_rounds: rounds,
            reasoning_depth: 3,
            file_type: "javascript".to_string(),
        }
    }

    fn orchestrator(service: Arc<dyn TextGenerationService>, models: &[&str]) -> AgentOrchestrator {
        let rotator = ModelRotator::new(models.iter().map(|m| m.to_string()).collect()).unwrap();
        AgentOrchestrator::new(service, rotator)
            .with_nonce_source(Arc::new(SeededNonce::new(1)))
            .with_clock(Arc::new(FixedClock(Utc.timestamp_opt(1_700_000_000, 0).unwrap())))
    }

    #[tokio::test]
    async fn test_one_fragment_per_agent_and_round() {
        let service = Arc::new(RecordingService::new());
        let output = orchestrator(service.clone(), &["a", "b"]).run(&params(3, 2)).await;

        assert_eq!(output.fragments.len(), 6);
        assert_eq!(service.calls.lock().unwrap().len(), 6);
        assert_eq!(output.rounds_run, 2);
        assert!(!output.deadline_hit);

        let order: Vec<(String, u32)> = output
            .fragments
            .iter()
            .map(|f| (f.agent_id.clone(), f.round))
            .collect();
        assert_eq!(
            order,
            vec![
                ("agent-0".to_string(), 0),
                ("agent-1".to_string(), 0),
                ("agent-2".to_string(), 0),
                ("agent-0".to_string(), 1),
                ("agent-1".to_string(), 1),
                ("agent-2".to_string(), 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_models_rotate_across_the_whole_run() {
        let service = Arc::new(RecordingService::new());
        let output = orchestrator(service, &["a", "b"]).run(&params(3, 2)).await;

        let models: Vec<&str> = output.fragments.iter().map(|f| f.model.as_str()).collect();
        assert_eq!(models, vec!["a", "b", "a", "b", "a", "b"]);
    }

    #[tokio::test]
    async fn test_lineage_follows_chain() {
        let service = Arc::new(RecordingService::new());
        let orch = orchestrator(service, &["a"]);
        let output = orch.run(&params(2, 3)).await;

        // Recompute agent-1's chain from its round-0 origin onward.
        let agent1: Vec<&Fragment> = output
            .fragments
            .iter()
            .filter(|f| f.agent_id == "agent-1")
            .collect();
        for pair in agent1.windows(2) {
            let expected = advance_origin(&pair[0].origin, &output.genesis, pair[1].round);
            assert_eq!(pair[1].origin, expected);
        }
        for f in &output.fragments {
            assert_eq!(f.entropy, shannon_entropy(f.origin.as_str()));
        }
    }

    #[tokio::test]
    async fn test_candidate_header_uses_pre_round_origin() {
        let service = Arc::new(RecordingService::new());
        let orch = orchestrator(service, &["gemma:latest"]);
        let genesis = genesis_hash("1700000000.000000", "let x = 0;");
        let initial = orch.spawn_agents(&genesis, 1).remove(0);

        // A fresh orchestrator reuses the same seeded nonce stream.
        let orch = orchestrator(Arc::new(RecordingService::new()), &["gemma:latest"]);
        let output = orch.run(&params(1, 1)).await;
        let fragment = &output.fragments[0];

        assert_eq!(output.genesis, genesis);
        assert_eq!(
            fragment.candidate,
            format!(
                "// Agent: agent-0 | Model: gemma:latest | Round: 1\n// Seed: {}\nx=1",
                initial.origin.short(12)
            )
        );
        assert_eq!(fragment.origin, advance_origin(&initial.origin, &genesis, 0));
    }

    #[tokio::test]
    async fn test_log_narrates_the_run() {
        let service = Arc::new(RecordingService::new());
        let output = orchestrator(service, &["a"]).run(&params(2, 2)).await;

        let kinds: Vec<LogKind> = output.log.iter().map(|e| e.kind).collect();
        assert_eq!(kinds[0], LogKind::Genesis);
        assert_eq!(output.log[1].message, "Orchestrating 2 agents for 2 rounds.");
        assert_eq!(output.log[2].message, "Starting Round 1/2...");
        assert_eq!(
            kinds.iter().filter(|k| **k == LogKind::Fragment).count(),
            4
        );
        assert!(output.log[0].message.starts_with("Genesis Hash: "));
        assert!(output.log[0].message.ends_with("..."));
    }

    #[tokio::test]
    async fn test_fan_out_modes_agree() {
        let concurrent = orchestrator(Arc::new(RecordingService::new()), &["a", "b", "c"])
            .run(&params(4, 3))
            .await;
        let sequential = orchestrator(Arc::new(RecordingService::new()), &["a", "b", "c"])
            .with_config(OrchestratorConfig {
                fan_out: FanOut::Sequential,
                deadline: None,
            })
            .run(&params(4, 3))
            .await;

        assert_eq!(concurrent.genesis, sequential.genesis);
        assert_eq!(concurrent.fragments, sequential.fragments);
    }

    #[tokio::test]
    async fn test_unrepresentable_deadline_runs_unbounded() {
        let output = orchestrator(Arc::new(RecordingService::new()), &["a"])
            .with_config(OrchestratorConfig {
                fan_out: FanOut::Concurrent,
                deadline: Some(Duration::from_secs(u64::MAX)),
            })
            .run(&params(2, 2))
            .await;

        assert_eq!(output.rounds_run, 2);
        assert!(!output.deadline_hit);
        assert!(output.fragments.iter().all(|f| !f.is_failed()));
    }

    #[test]
    fn test_fan_out_parsing() {
        assert_eq!("Sequential".parse::<FanOut>().unwrap(), FanOut::Sequential);
        assert_eq!("concurrent".parse::<FanOut>().unwrap(), FanOut::Concurrent);
        assert!("parallel".parse::<FanOut>().is_err());
    }
}
