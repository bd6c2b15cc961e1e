use crate::embedding::{cosine_similarity, Embedder};
use crate::error::{GraphError, Result};
use crate::graphs::GraphStore;
use crate::types::*;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub node: Iri,
    pub text: String,
    pub score: f32,
}

/// Rank every `hasText` literal by cosine similarity to `query`.
///
/// Hits scoring below `threshold` are dropped. The sort is stable, so equal
/// scores keep store insertion order. Embeddings are computed fresh on each
/// call.
pub fn search(
    store: &GraphStore,
    embedder: &dyn Embedder,
    query: &str,
    threshold: f32,
) -> Result<Vec<SearchHit>> {
    let query_vector = embed_checked(embedder, query)?;

    let mut hits = Vec::new();
    for statement in store.with_relation(Relation::HasText) {
        let Some(text) = statement.object.as_literal().and_then(Literal::as_str) else {
            continue;
        };
        let vector = embed_checked(embedder, text)?;
        let score = cosine_similarity(&query_vector, &vector);
        if score >= threshold {
            hits.push(SearchHit {
                node: statement.subject.clone(),
                text: text.to_string(),
                score,
            });
        }
    }

    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    debug!(query, threshold, hits = hits.len(), "Similarity search complete");
    Ok(hits)
}

/// [`search`] truncated to the `k` best hits
pub fn search_top_k(
    store: &GraphStore,
    embedder: &dyn Embedder,
    query: &str,
    threshold: f32,
    k: usize,
) -> Result<Vec<SearchHit>> {
    let mut hits = search(store, embedder, query, threshold)?;
    hits.truncate(k);
    Ok(hits)
}

fn embed_checked(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    let vector = embedder.embed(text)?;
    if vector.len() != embedder.dimension() {
        return Err(GraphError::Embedding(format!(
            "{} returned {} values, expected {}",
            embedder.name(),
            vector.len(),
            embedder.dimension()
        )));
    }
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;

    fn store_with_texts(texts: &[&str]) -> GraphStore {
        let mut store = GraphStore::new();
        for (i, text) in texts.iter().enumerate() {
            store.insert(Statement::literal(
                Iri::ex(&format!("p_{}", i + 2)),
                Relation::HasText,
                Literal::string(*text),
            ));
        }
        store
    }

    #[test]
    fn ranks_descending_and_threshold_is_monotonic() {
        let store = store_with_texts(&["red shoes", "blue car", "red car"]);
        let embedder = HashingEmbedder::default();

        let all = search(&store, &embedder, "red", 0.0).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].score >= w[1].score));
        assert_ne!(all[0].text, "blue car");

        let lowest = all.last().unwrap().score;
        let fewer = search(&store, &embedder, "red", lowest + 1e-4).unwrap();
        assert!(fewer.len() < all.len());
    }

    #[test]
    fn nothing_above_threshold_is_empty_not_error() {
        let store = store_with_texts(&["alpha", "beta"]);
        let hits = search(&store, &HashingEmbedder::default(), "gamma", 0.99).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn top_k_truncates() {
        let store = store_with_texts(&["red one", "red two", "red three"]);
        let hits = search_top_k(&store, &HashingEmbedder::default(), "red", 0.0, 2).unwrap();
        assert_eq!(hits.len(), 2);
    }

    struct BrokenEmbedder;

    impl Embedder for BrokenEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0; 3])
        }

        fn dimension(&self) -> usize {
            4
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn dimension_mismatch_is_an_embedding_error() {
        let store = store_with_texts(&["anything"]);
        let err = search(&store, &BrokenEmbedder, "x", 0.0).unwrap_err();
        assert!(matches!(err, GraphError::Embedding(_)));
    }
}
