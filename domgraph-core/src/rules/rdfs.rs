use super::closure::{compose, domain_range, run_to_fixpoint, subclass_membership, subproperty_inheritance};
use super::engine::InferenceRule;
use crate::error::Result;
use crate::graphs::GraphStore;
use crate::types::Relation;

/// RDFS entailment subset: rdfs2, rdfs3, rdfs5, rdfs7, rdfs9, rdfs11
pub struct RdfsRule {
    max_iterations: usize,
}

impl RdfsRule {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }
}

impl InferenceRule for RdfsRule {
    fn apply(&self, store: &mut GraphStore) -> Result<usize> {
        run_to_fixpoint(store, self.name(), self.max_iterations, |snapshot| {
            let mut derived = domain_range(snapshot);
            derived.extend(compose(snapshot, Relation::SubPropertyOf));
            derived.extend(subproperty_inheritance(snapshot));
            derived.extend(subclass_membership(snapshot));
            derived.extend(compose(snapshot, Relation::SubClassOf));
            derived
        })
    }

    fn name(&self) -> &str {
        "Rdfs"
    }
}
