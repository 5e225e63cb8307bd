//! Data types shared by the orchestrator and the consensus assembler.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::lineage::HashDigest;

/// A participant of one run. Lives only for the duration of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub id: String,
    /// Current head of this agent's hash chain
    pub origin: HashDigest,
}

impl Agent {
    /// Conventional id for the agent at `index`.
    pub fn id_for(index: usize) -> String {
        format!("agent-{index}")
    }
}

/// Whether a fragment carries a real completion or a failure placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentStatus {
    Generated,
    Failed,
}

/// One agent's output for one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    pub agent_id: String,
    /// Agent origin after this round's advance
    pub origin: HashDigest,
    /// Zero-based round index
    pub round: u32,
    /// Candidate text including its header lines
    pub candidate: String,
    /// Entropy of `origin`, rounded to 3 decimals
    pub entropy: f64,
    pub model: String,
    pub status: FragmentStatus,
}

impl Fragment {
    pub fn is_failed(&self) -> bool {
        self.status == FragmentStatus::Failed
    }
}

/// Fragments that share a normalized candidate text.
#[derive(Debug, Clone)]
pub struct CandidateGroup {
    pub key: String,
    /// Members in insertion order
    pub candidates: Vec<Fragment>,
    pub total_entropy: f64,
    pub agent_set: BTreeSet<String>,
    pub round_set: BTreeSet<u32>,
    /// Index into `candidates` of the highest-entropy member (first seen wins ties)
    root: usize,
}

impl CandidateGroup {
    pub fn new(key: String, first: Fragment) -> Self {
        let mut group = Self {
            key,
            candidates: Vec::new(),
            total_entropy: 0.0,
            agent_set: BTreeSet::new(),
            round_set: BTreeSet::new(),
            root: 0,
        };
        group.push(first);
        group
    }

    pub fn push(&mut self, fragment: Fragment) {
        self.total_entropy += fragment.entropy;
        self.agent_set.insert(fragment.agent_id.clone());
        self.round_set.insert(fragment.round);

        if let Some(root) = self.candidates.get(self.root) {
            if fragment.entropy > root.entropy {
                self.root = self.candidates.len();
            }
        }
        self.candidates.push(fragment);
    }

    /// First fragment inserted into the group.
    pub fn first_candidate(&self) -> &Fragment {
        &self.candidates[0]
    }

    /// Highest-entropy fragment of the group.
    pub fn root_candidate(&self) -> &Fragment {
        &self.candidates[self.root]
    }

    pub fn agent_count(&self) -> usize {
        self.agent_set.len()
    }

    pub fn round_count(&self) -> usize {
        self.round_set.len()
    }

    pub fn avg_entropy(&self) -> f64 {
        self.total_entropy / self.candidates.len() as f64
    }
}

/// Scoring detail for one group, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredGroup {
    pub key: String,
    pub score: f64,
    pub agent_count: usize,
    pub round_count: usize,
    pub avg_entropy: f64,
    pub fragment_count: usize,
    pub root_agent: String,
    pub root_entropy: f64,
    /// Candidate text of the first fragment in the group
    pub candidate: String,
    /// Candidate text of the highest-entropy fragment in the group
    pub root_candidate: String,
}

/// Outcome of consensus assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusResult {
    pub genesis: HashDigest,
    /// First-inserted candidate of the top group; empty when nothing grouped
    pub selected_candidate: String,
    pub score: f64,
    pub agent_count: usize,
    pub round_count: usize,
    pub avg_entropy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_entropy: Option<f64>,
    /// Highest-entropy candidate of the top group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_candidate: Option<String>,
    pub all_groups: Vec<ScoredGroup>,
}

impl ConsensusResult {
    /// Result for a run where no fragment produced a usable candidate.
    pub fn empty(genesis: HashDigest) -> Self {
        Self {
            genesis,
            selected_candidate: String::new(),
            score: 0.0,
            agent_count: 0,
            round_count: 0,
            avg_entropy: 0.0,
            root_agent: None,
            root_entropy: None,
            root_candidate: None,
            all_groups: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.all_groups.is_empty()
    }
}
