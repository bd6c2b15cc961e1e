use super::closure::*;
use super::engine::InferenceRule;
use crate::error::Result;
use crate::graphs::GraphStore;
use crate::types::Relation;

/// OWL-RL subset: prp-symp, prp-trp, prp-inv1/2, prp-dom, prp-rng,
/// prp-spo1, cax-sco, cax-eqc1/2, scm-sco
pub struct OwlRlRule {
    max_iterations: usize,
}

impl OwlRlRule {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }
}

impl InferenceRule for OwlRlRule {
    fn apply(&self, store: &mut GraphStore) -> Result<usize> {
        run_to_fixpoint(store, self.name(), self.max_iterations, |snapshot| {
            let mut derived = symmetric(snapshot);
            derived.extend(transitive(snapshot));
            derived.extend(inverses(snapshot));
            derived.extend(domain_range(snapshot));
            derived.extend(subproperty_inheritance(snapshot));
            derived.extend(subclass_membership(snapshot));
            derived.extend(equivalent_class_membership(snapshot));
            derived.extend(compose(snapshot, Relation::SubClassOf));
            derived
        })
    }

    fn name(&self) -> &str {
        "OwlRl"
    }
}
