//! Embedding trait definitions.

use crate::error::Result;

/// Turns text into a fixed-width vector. Implementations are synchronous;
/// the search layer recomputes embeddings on every call.
pub trait Embedder {
    /// Generate the embedding for one text.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Return the embedding dimension.
    fn dimension(&self) -> usize;

    fn name(&self) -> &str;
}

/// Cosine similarity of two vectors. Zero-norm inputs score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a < 1e-10 || norm_b < 1e-10 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
