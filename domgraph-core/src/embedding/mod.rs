//! Embedding module for vector embeddings.
//!
//! # Providers
//!
//! - [`HashingEmbedder`]: deterministic feature hashing of words and
//!   character trigrams. Needs no model files.
//!
//! Anything implementing [`Embedder`] can back the similarity search.

pub mod hashing;
pub mod traits;

pub use hashing::HashingEmbedder;
pub use traits::{cosine_similarity, Embedder};
