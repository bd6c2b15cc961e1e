// Query/search layer - read-only consumers of the graph store
// - parser.rs: pattern query lexer, parser and AST
// - executor.rs: binding join and FILTER evaluation
// - search.rs: embedding similarity search over hasText literals

pub mod executor;
pub mod parser;
pub mod search;

pub use executor::{Bindings, QueryResults};
pub use parser::PatternQuery;
pub use search::{search, search_top_k, SearchHit};

use crate::config::SearchConfig;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::graphs::GraphStore;

/// Parse and run a pattern query in one step
pub fn query(store: &GraphStore, text: &str) -> Result<QueryResults> {
    Ok(PatternQuery::parse(text)?.execute(store))
}

/// Borrowed view pairing a store with an embedder and search defaults
pub struct QueryBasedSearch<'s> {
    store: &'s GraphStore,
    embedder: &'s dyn Embedder,
    config: SearchConfig,
}

impl<'s> QueryBasedSearch<'s> {
    pub fn new(store: &'s GraphStore, embedder: &'s dyn Embedder, config: &SearchConfig) -> Self {
        Self {
            store,
            embedder,
            config: config.clone(),
        }
    }

    pub fn search(&self, text: &str, threshold: Option<f32>) -> Result<Vec<SearchHit>> {
        search::search(
            self.store,
            self.embedder,
            text,
            threshold.unwrap_or(self.config.threshold),
        )
    }

    /// Ranked hits truncated to the configured `top_k`
    pub fn search_top(&self, text: &str) -> Result<Vec<SearchHit>> {
        search::search_top_k(
            self.store,
            self.embedder,
            text,
            self.config.threshold,
            self.config.top_k,
        )
    }

    pub fn query(&self, text: &str) -> Result<QueryResults> {
        query(self.store, text)
    }
}
