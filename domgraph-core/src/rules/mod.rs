// Inference rules - delegates to one module per strategy
// - engine.rs: InferenceEngine, the InferenceRule trait and strategy selection
// - closure.rs: shared entailment steps and the fixpoint driver
// - transitive_contains.rs: containment closure
// - class_similarity.rs: shared-class similarity
// - rdfs.rs / owl_rl.rs: RDFS and OWL-RL closure subsets

pub mod class_similarity;
pub mod closure;
pub mod engine;
pub mod owl_rl;
pub mod rdfs;
pub mod transitive_contains;

pub use class_similarity::ClassSimilarityRule;
pub use engine::{InferenceEngine, InferenceRule, ReasoningStrategy};
pub use owl_rl::OwlRlRule;
pub use rdfs::RdfsRule;
pub use transitive_contains::TransitiveContainsRule;
