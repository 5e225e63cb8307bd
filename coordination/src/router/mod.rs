//! Model Router Module
//!
//! Assigns a generation model to every agent call. Assignment is a plain
//! round-robin over the configured model list, counted across the whole
//! run rather than per agent or per round:
//!
//! ```text
//! models = [gemma, deepseek]      agents = 3, rounds = 2
//!
//! round 1:  agent-0 → gemma     agent-1 → deepseek   agent-2 → gemma
//! round 2:  agent-0 → deepseek  agent-1 → gemma      agent-2 → deepseek
//! ```

pub mod rotator;

pub use rotator::{default_models, ModelRotator, RotatorError, RotatorResult};
