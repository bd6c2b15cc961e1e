// Domgraph Core Library
//
// Turns parsed HTML into a typed knowledge graph, expands it by rule-based
// inference and answers pattern queries and similarity searches over it.

pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod graphs;
pub mod hashing;
pub mod preprocessors;
pub mod processor;
pub mod query;
pub mod rules;
pub mod schema;
pub mod segmentation;
pub mod types;

// Re-export main types and functions for easy use
pub use config::GraphConfig;
pub use document::{DocumentTree, DomNode, ElementNode};
pub use embedding::{Embedder, HashingEmbedder};
pub use error::{GraphError, Result};
pub use graphs::{GraphAnalytics, GraphBuilder, GraphStore};
pub use preprocessors::{HtmlPreprocessor, Preprocessor};
pub use processor::{PageProcessor, ProcessedPage, ProcessingReport};
pub use query::{PatternQuery, QueryBasedSearch, QueryResults, SearchHit};
pub use rules::{InferenceEngine, ReasoningStrategy};
pub use schema::Schema;
pub use types::*;
