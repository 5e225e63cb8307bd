//! Round-robin model rotation shared by all agents of a run.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

/// Error type for rotator construction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RotatorError {
    #[error("Model list is empty")]
    Empty,

    #[error("Blank model identifier at position {0}")]
    BlankModel(usize),
}

/// Result type for rotator operations
pub type RotatorResult<T> = Result<T, RotatorError>;

/// Models used when none are configured.
pub fn default_models() -> Vec<String> {
    [
        "gemma:latest",
        "deepseek-coder:latest",
        "gemma:latest",
        "deepseek-coder:latest",
        "gemma:latest",
    ]
    .iter()
    .map(|m| m.to_string())
    .collect()
}

/// Round-robin selector over an ordered, non-empty model list.
///
/// The counter is a single atomic, so concurrent callers each receive a
/// distinct slot of the sequence.
#[derive(Debug)]
pub struct ModelRotator {
    models: Vec<String>,
    counter: AtomicUsize,
}

impl ModelRotator {
    pub fn new(models: Vec<String>) -> RotatorResult<Self> {
        if models.is_empty() {
            return Err(RotatorError::Empty);
        }
        if let Some(pos) = models.iter().position(|m| m.trim().is_empty()) {
            return Err(RotatorError::BlankModel(pos));
        }
        Ok(Self {
            models,
            counter: AtomicUsize::new(0),
        })
    }

    /// Return the model for the next call and advance the counter.
    pub fn next(&self) -> &str {
        let slot = self.counter.fetch_add(1, Ordering::SeqCst);
        let model = &self.models[slot % self.models.len()];
        debug!(slot, model = %model, "Model assigned");
        model
    }

    /// Number of models handed out so far.
    pub fn issued(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }

    /// Rewind to the first model.
    pub fn reset(&self) {
        self.counter.store(0, Ordering::SeqCst);
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn rotator(models: &[&str]) -> ModelRotator {
        ModelRotator::new(models.iter().map(|m| m.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_round_robin_order() {
        let r = rotator(&["a", "b", "c"]);
        let drawn: Vec<&str> = (0..7).map(|_| r.next()).collect();
        assert_eq!(drawn, vec!["a", "b", "c", "a", "b", "c", "a"]);
        assert_eq!(r.issued(), 7);
    }

    #[test]
    fn test_reset_rewinds() {
        let r = rotator(&["a", "b"]);
        r.next();
        r.reset();
        assert_eq!(r.next(), "a");
    }

    #[test]
    fn test_empty_list_rejected() {
        assert_eq!(ModelRotator::new(vec![]).unwrap_err(), RotatorError::Empty);
        assert_eq!(
            ModelRotator::new(vec!["a".into(), "  ".into()]).unwrap_err(),
            RotatorError::BlankModel(1)
        );
    }

    #[test]
    fn test_default_models() {
        let models = default_models();
        assert_eq!(models.len(), 5);
        assert_eq!(models[0], "gemma:latest");
        assert_eq!(models[1], "deepseek-coder:latest");
    }

    #[test]
    fn test_concurrent_draws_cover_every_slot() {
        let r = Arc::new(rotator(&["a", "b", "c", "d"]));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let r = Arc::clone(&r);
                std::thread::spawn(move || {
                    (0..100).map(|_| r.next().to_string()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut tally: HashMap<String, usize> = HashMap::new();
        for h in handles {
            for m in h.join().unwrap() {
                *tally.entry(m).or_insert(0) += 1;
            }
        }

        assert_eq!(r.issued(), 800);
        for model in ["a", "b", "c", "d"] {
            assert_eq!(tally[model], 200);
        }
    }
}
