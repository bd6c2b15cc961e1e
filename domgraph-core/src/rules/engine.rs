use super::class_similarity::ClassSimilarityRule;
use super::owl_rl::OwlRlRule;
use super::rdfs::RdfsRule;
use super::transitive_contains::TransitiveContainsRule;
use crate::config::ReasoningConfig;
use crate::error::{GraphError, Result};
use crate::graphs::GraphStore;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// A monotonic inference step over the store. Returns how many statements
/// it added.
pub trait InferenceRule {
    fn apply(&self, store: &mut GraphStore) -> Result<usize>;
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReasoningStrategy {
    TransitiveContains,
    ClassSimilarity,
    Rdfs,
    OwlRl,
}

impl ReasoningStrategy {
    pub const ALL: [ReasoningStrategy; 4] = [
        ReasoningStrategy::TransitiveContains,
        ReasoningStrategy::ClassSimilarity,
        ReasoningStrategy::Rdfs,
        ReasoningStrategy::OwlRl,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ReasoningStrategy::TransitiveContains => "TransitiveContains",
            ReasoningStrategy::ClassSimilarity => "ClassSimilarity",
            ReasoningStrategy::Rdfs => "Rdfs",
            ReasoningStrategy::OwlRl => "OwlRl",
        }
    }
}

impl fmt::Display for ReasoningStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReasoningStrategy {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "transitivecontains" | "hol" => Ok(ReasoningStrategy::TransitiveContains),
            "classsimilarity" | "ulkb" => Ok(ReasoningStrategy::ClassSimilarity),
            "rdfs" => Ok(ReasoningStrategy::Rdfs),
            "owlrl" | "owl" => Ok(ReasoningStrategy::OwlRl),
            _ => Err(GraphError::Config(format!("Unknown reasoning strategy: {s}"))),
        }
    }
}

pub struct InferenceEngine {
    config: ReasoningConfig,
    rule_timings: RefCell<Vec<(String, Duration)>>,
}

impl Default for InferenceEngine {
    fn default() -> Self {
        Self::new(&ReasoningConfig::default())
    }
}

impl InferenceEngine {
    pub fn new(config: &ReasoningConfig) -> Self {
        Self {
            config: config.clone(),
            rule_timings: RefCell::new(Vec::new()),
        }
    }

    pub fn rule_for(&self, strategy: ReasoningStrategy) -> Box<dyn InferenceRule> {
        let max_iterations = self.config.max_iterations;
        match strategy {
            ReasoningStrategy::TransitiveContains => Box::new(TransitiveContainsRule::new(
                self.config.transitive_contains,
                max_iterations,
            )),
            ReasoningStrategy::ClassSimilarity => Box::new(ClassSimilarityRule),
            ReasoningStrategy::Rdfs => Box::new(RdfsRule::new(max_iterations)),
            ReasoningStrategy::OwlRl => Box::new(OwlRlRule::new(max_iterations)),
        }
    }

    /// Run one strategy in place and hand the same store back for chaining.
    /// On failure, statements added before the error stay.
    pub fn infer<'s>(
        &self,
        store: &'s mut GraphStore,
        strategy: ReasoningStrategy,
    ) -> Result<&'s mut GraphStore> {
        let rule = self.rule_for(strategy);
        let before = store.len();
        let rule_start = Instant::now();

        let result = rule.apply(store);

        let rule_duration = rule_start.elapsed();
        self.rule_timings
            .borrow_mut()
            .push((rule.name().to_string(), rule_duration));

        match result {
            Ok(added) => {
                info!(
                    rule = rule.name(),
                    added,
                    total = store.len(),
                    elapsed_ms = rule_duration.as_millis() as u64,
                    "Applied inference rule"
                );
                Ok(store)
            }
            Err(e) => {
                warn!(
                    rule = rule.name(),
                    kept = store.len() - before,
                    error = %e,
                    "Inference rule failed"
                );
                Err(e)
            }
        }
    }

    /// Run several strategies in order, returning the statements added.
    /// Timings from any earlier run are discarded.
    pub fn apply_strategies(
        &self,
        store: &mut GraphStore,
        strategies: &[ReasoningStrategy],
    ) -> Result<usize> {
        self.rule_timings.borrow_mut().clear();
        let before = store.len();
        for strategy in strategies {
            self.infer(store, *strategy)?;
        }
        Ok(store.len() - before)
    }

    /// Run the configured pipeline. Every rule name is resolved before any
    /// rule runs, so a typo fails without touching the store.
    pub fn apply_pipeline(&self, store: &mut GraphStore) -> Result<usize> {
        let mut strategies = Vec::new();
        for rule_config in &self.config.pipeline.rules {
            let strategy: ReasoningStrategy = rule_config.name.parse()?;
            if !rule_config.enabled {
                info!(rule = %rule_config.name, "Skipping disabled rule");
                continue;
            }
            strategies.push(strategy);
        }
        self.apply_strategies(store, &strategies)
    }

    pub fn timings(&self) -> Vec<(String, Duration)> {
        self.rule_timings.borrow().clone()
    }
}
