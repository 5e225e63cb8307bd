//! Consensus assembly - grouping, scoring and selection of candidates
//!
//! Fragments whose candidates normalize to the same text form a group.
//! Each group is scored by how many distinct agents produced it, in how
//! many distinct rounds it appeared, and by the mean entropy of the
//! lineage hashes behind it:
//!
//! ```text
//! score = agents × 2 + rounds × 1.5 + avg_entropy × 3
//! ```
//!
//! The group with the highest score wins; ties keep discovery order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::normalize::{CommentLineNormalizer, Normalizer};
use super::types::{CandidateGroup, ConsensusResult, Fragment, ScoredGroup};
use crate::lineage::{round3, HashDigest};

/// Weights of the three scoring terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Per distinct agent
    pub agent: f64,
    /// Per distinct round
    pub round: f64,
    /// Per bit of average entropy
    pub entropy: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            agent: 2.0,
            round: 1.5,
            entropy: 3.0,
        }
    }
}

impl ScoreWeights {
    /// Unrounded score for the given group statistics.
    pub fn score(&self, agent_count: usize, round_count: usize, avg_entropy: f64) -> f64 {
        agent_count as f64 * self.agent + round_count as f64 * self.round + avg_entropy * self.entropy
    }
}

/// Groups fragments and picks the consensus candidate.
pub struct ConsensusAssembler {
    normalizer: Box<dyn Normalizer>,
    weights: ScoreWeights,
}

impl Default for ConsensusAssembler {
    fn default() -> Self {
        Self::new(Box::new(CommentLineNormalizer::default()))
    }
}

impl ConsensusAssembler {
    pub fn new(normalizer: Box<dyn Normalizer>) -> Self {
        Self {
            normalizer,
            weights: ScoreWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Group fragments by normalized candidate text, in discovery order.
    pub fn group(&self, fragments: &[Fragment]) -> Vec<CandidateGroup> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<CandidateGroup> = Vec::new();

        for fragment in fragments {
            let key = self.normalizer.normalize(&fragment.candidate);
            if key.is_empty() {
                debug!(
                    agent_id = %fragment.agent_id,
                    round = fragment.round,
                    "Fragment has no code after normalization, skipped"
                );
                continue;
            }

            match index.get(&key) {
                Some(&slot) => groups[slot].push(fragment.clone()),
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push(CandidateGroup::new(key, fragment.clone()));
                }
            }
        }

        groups
    }

    /// Score one group.
    pub fn score_group(&self, group: &CandidateGroup) -> ScoredGroup {
        let agent_count = group.agent_count();
        let round_count = group.round_count();
        let avg_entropy = group.avg_entropy();
        let root = group.root_candidate();

        ScoredGroup {
            key: group.key.clone(),
            score: round3(self.weights.score(agent_count, round_count, avg_entropy)),
            agent_count,
            round_count,
            avg_entropy: round3(avg_entropy),
            fragment_count: group.candidates.len(),
            root_agent: root.agent_id.clone(),
            root_entropy: root.entropy,
            candidate: group.first_candidate().candidate.clone(),
            root_candidate: root.candidate.clone(),
        }
    }

    /// Build the consensus for a run.
    pub fn assemble(&self, fragments: &[Fragment], genesis: &HashDigest) -> ConsensusResult {
        let mut scored: Vec<ScoredGroup> = self
            .group(fragments)
            .iter()
            .map(|group| self.score_group(group))
            .collect();

        // sort_by is stable: equal scores keep discovery order
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        let Some(top) = scored.first().cloned() else {
            info!(fragments = fragments.len(), "No candidates to assemble");
            return ConsensusResult::empty(genesis.clone());
        };

        info!(
            groups = scored.len(),
            score = top.score,
            agents = top.agent_count,
            rounds = top.round_count,
            root_agent = %top.root_agent,
            "Consensus assembled"
        );

        ConsensusResult {
            genesis: genesis.clone(),
            selected_candidate: top.candidate,
            score: top.score,
            agent_count: top.agent_count,
            round_count: top.round_count,
            avg_entropy: top.avg_entropy,
            root_agent: Some(top.root_agent),
            root_entropy: Some(top.root_entropy),
            root_candidate: Some(top.root_candidate),
            all_groups: scored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::types::FragmentStatus;
    use crate::lineage::digest;

    fn fragment(agent: &str, round: u32, code: &str, entropy: f64) -> Fragment {
        Fragment {
            agent_id: agent.to_string(),
            origin: digest(format!("{agent}/{round}")),
            round,
            candidate: format!("// Agent: {agent} | Round: {}\n// Seed: 0000\n{code}", round + 1),
            entropy,
            model: "gemma:latest".to_string(),
            status: FragmentStatus::Generated,
        }
    }

    fn genesis() -> HashDigest {
        digest("genesis")
    }

    #[test]
    fn test_two_agents_agreeing() {
        let assembler = ConsensusAssembler::default();
        let fragments = vec![
            fragment("agent-0", 0, "x=1", 3.1),
            fragment("agent-1", 0, "x=1", 3.3),
        ];

        let result = assembler.assemble(&fragments, &genesis());
        assert_eq!(result.agent_count, 2);
        assert_eq!(result.round_count, 1);
        assert_eq!(result.avg_entropy, 3.2);
        assert_eq!(result.score, 15.1);
        assert_eq!(result.all_groups.len(), 1);
        assert_eq!(result.all_groups[0].key, "x=1");
        assert_eq!(result.all_groups[0].fragment_count, 2);
    }

    #[test]
    fn test_selected_is_first_inserted_root_is_highest_entropy() {
        let assembler = ConsensusAssembler::default();
        let fragments = vec![
            fragment("agent-0", 0, "x=1", 3.5),
            fragment("agent-1", 0, "x=1", 3.9),
        ];

        let result = assembler.assemble(&fragments, &genesis());
        assert!(result.selected_candidate.contains("agent-0"));
        assert_eq!(result.root_agent.as_deref(), Some("agent-1"));
        assert_eq!(result.root_entropy, Some(3.9));
        assert!(result.root_candidate.unwrap().contains("agent-1"));
    }

    #[test]
    fn test_agreement_beats_singletons() {
        let assembler = ConsensusAssembler::default();
        let fragments = vec![
            fragment("agent-0", 0, "a()", 4.0),
            fragment("agent-1", 0, "b()", 3.5),
            fragment("agent-2", 0, "b()", 3.5),
        ];

        let result = assembler.assemble(&fragments, &genesis());
        assert_eq!(result.all_groups[0].key, "b()");
        assert_eq!(result.all_groups[1].key, "a()");
        assert!(result.selected_candidate.ends_with("b()"));
    }

    #[test]
    fn test_ties_keep_discovery_order() {
        let assembler = ConsensusAssembler::default();
        let fragments = vec![
            fragment("agent-0", 0, "first()", 3.7),
            fragment("agent-1", 0, "second()", 3.7),
            fragment("agent-2", 0, "third()", 3.7),
        ];

        let result = assembler.assemble(&fragments, &genesis());
        let keys: Vec<&str> = result.all_groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["first()", "second()", "third()"]);
    }

    #[test]
    fn test_same_agent_across_rounds_counts_once() {
        let assembler = ConsensusAssembler::default();
        let fragments = vec![
            fragment("agent-0", 0, "x=1", 3.0),
            fragment("agent-0", 1, "x=1", 3.0),
            fragment("agent-0", 2, "x=1", 3.0),
        ];

        let group = &assembler.assemble(&fragments, &genesis()).all_groups[0];
        assert_eq!(group.agent_count, 1);
        assert_eq!(group.round_count, 3);
        assert_eq!(group.fragment_count, 3);
        assert_eq!(group.score, 2.0 + 4.5 + 9.0);
    }

    #[test]
    fn test_empty_input_is_degenerate() {
        let result = ConsensusAssembler::default().assemble(&[], &genesis());
        assert_eq!(result.selected_candidate, "");
        assert_eq!(result.score, 0.0);
        assert!(result.all_groups.is_empty());
        assert_eq!(result.root_agent, None);
        assert_eq!(result.genesis, genesis());
    }

    #[test]
    fn test_comment_only_candidates_are_skipped() {
        let mut f = fragment("agent-0", 0, "", 3.0);
        f.candidate = "// Agent agent-0 failed\n// nothing else".to_string();
        let result = ConsensusAssembler::default().assemble(&[f], &genesis());
        assert!(result.is_empty());
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let assembler = ConsensusAssembler::default();
        let fragments = vec![
            fragment("agent-0", 0, "a()", 3.6),
            fragment("agent-1", 0, "b()", 3.8),
            fragment("agent-0", 1, "b()", 3.4),
            fragment("agent-1", 1, "a()", 3.9),
        ];

        let first = assembler.assemble(&fragments, &genesis());
        let second = assembler.assemble(&fragments, &genesis());
        assert_eq!(first, second);
    }

    #[test]
    fn test_each_term_is_monotonic() {
        let w = ScoreWeights::default();
        assert!(w.score(3, 2, 3.5) > w.score(2, 2, 3.5));
        assert!(w.score(2, 3, 3.5) > w.score(2, 2, 3.5));
        assert!(w.score(2, 2, 3.6) > w.score(2, 2, 3.5));
    }

    #[test]
    fn test_custom_weights() {
        let assembler = ConsensusAssembler::default().with_weights(ScoreWeights {
            agent: 1.0,
            round: 0.0,
            entropy: 0.0,
        });
        let result = assembler.assemble(&[fragment("agent-0", 0, "x", 3.3)], &genesis());
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn test_failed_singleton_competes_like_any_singleton() {
        // A failure placeholder is scored by the same formula as a real
        // candidate, so with no agreement it wins on lineage entropy alone.
        let assembler = ConsensusAssembler::default();
        let failed = Fragment {
            candidate: crate::generation::render_failure(
                "//",
                "agent-0",
                0,
                "Request failed: connection refused",
            ),
            status: FragmentStatus::Failed,
            ..fragment("agent-0", 0, "", 3.6)
        };
        let fragments = vec![failed, fragment("agent-1", 0, "x=1", 3.4)];

        let result = assembler.assemble(&fragments, &genesis());
        assert_eq!(result.all_groups.len(), 2);
        assert_eq!(result.all_groups[0].key, "[generation failed: agent-0, round 1]");
        assert!(result
            .selected_candidate
            .starts_with("// Agent agent-0 failed to generate a response."));
        assert_eq!(result.score, 14.3);
    }
}
