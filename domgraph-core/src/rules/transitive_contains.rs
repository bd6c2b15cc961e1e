use super::closure::{compose, run_to_fixpoint};
use super::engine::InferenceRule;
use crate::config::TransitiveMode;
use crate::error::Result;
use crate::graphs::GraphStore;
use crate::types::Relation;

/// (A contains B), (B contains C) ⊢ (A contains C).
///
/// `SinglePass` reads one snapshot and stops, so a chain of four nodes gains
/// only the two-hop edges. `Fixpoint` repeats until nothing new appears.
pub struct TransitiveContainsRule {
    mode: TransitiveMode,
    max_iterations: usize,
}

impl TransitiveContainsRule {
    pub fn new(mode: TransitiveMode, max_iterations: usize) -> Self {
        Self {
            mode,
            max_iterations,
        }
    }
}

impl InferenceRule for TransitiveContainsRule {
    fn apply(&self, store: &mut GraphStore) -> Result<usize> {
        match self.mode {
            TransitiveMode::SinglePass => {
                let derived = compose(store, Relation::Contains);
                Ok(store.extend(derived))
            }
            TransitiveMode::Fixpoint => {
                run_to_fixpoint(store, self.name(), self.max_iterations, |snapshot| {
                    compose(snapshot, Relation::Contains)
                })
            }
        }
    }

    fn name(&self) -> &str {
        "TransitiveContains"
    }
}
