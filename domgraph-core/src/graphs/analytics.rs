use super::graph::GraphStore;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use tracing::{info, warn};

const PAGERANK_DAMPING: f64 = 0.85;
const PAGERANK_TOLERANCE: f64 = 1e-6;
const PAGERANK_MAX_ITERATIONS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeCentrality {
    pub node: Iri,
    pub degree: f64,
    pub betweenness: f64,
    pub pagerank: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSummary {
    pub statements: usize,
    pub subjects: usize,
    pub relation_counts: BTreeMap<String, usize>,
    pub category_counts: BTreeMap<String, usize>,
}

/// Undirected simple graph over the resource-to-resource statements.
/// Nodes are kept in sorted order so scores are reproducible.
struct NodeGraph {
    nodes: Vec<Iri>,
    adjacency: Vec<Vec<usize>>,
    edges: usize,
}

impl NodeGraph {
    fn from_store(store: &GraphStore) -> Self {
        let mut pairs: BTreeSet<(Iri, Iri)> = BTreeSet::new();
        for statement in store {
            if let Term::Resource(object) = &statement.object {
                if *object == statement.subject {
                    continue;
                }
                let (a, b) = if statement.subject < *object {
                    (statement.subject.clone(), object.clone())
                } else {
                    (object.clone(), statement.subject.clone())
                };
                pairs.insert((a, b));
            }
        }

        let nodes: Vec<Iri> = pairs
            .iter()
            .flat_map(|(a, b)| [a.clone(), b.clone()])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index: HashMap<&Iri, usize> = nodes.iter().enumerate().map(|(i, n)| (n, i)).collect();

        let mut adjacency = vec![Vec::new(); nodes.len()];
        for (a, b) in &pairs {
            let (ia, ib) = (index[a], index[b]);
            adjacency[ia].push(ib);
            adjacency[ib].push(ia);
        }

        Self {
            edges: pairs.len(),
            nodes,
            adjacency,
        }
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn degree_centrality(&self) -> Vec<f64> {
        let n = self.len();
        if n <= 1 {
            return vec![1.0; n];
        }
        let scale = 1.0 / (n - 1) as f64;
        self.adjacency.iter().map(|adj| adj.len() as f64 * scale).collect()
    }

    /// Brandes' algorithm, normalized by 1/((n-1)(n-2)) over ordered pairs
    fn betweenness_centrality(&self) -> Vec<f64> {
        let n = self.len();
        let mut betweenness = vec![0.0f64; n];

        for source in 0..n {
            let mut stack = Vec::with_capacity(n);
            let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
            let mut sigma = vec![0.0f64; n];
            let mut distance: Vec<Option<usize>> = vec![None; n];
            sigma[source] = 1.0;
            distance[source] = Some(0);

            let mut queue = VecDeque::from([source]);
            while let Some(v) = queue.pop_front() {
                stack.push(v);
                let dv = distance[v].unwrap_or(0);
                for &w in &self.adjacency[v] {
                    if distance[w].is_none() {
                        distance[w] = Some(dv + 1);
                        queue.push_back(w);
                    }
                    if distance[w] == Some(dv + 1) {
                        sigma[w] += sigma[v];
                        predecessors[w].push(v);
                    }
                }
            }

            let mut delta = vec![0.0f64; n];
            while let Some(w) = stack.pop() {
                for &v in &predecessors[w] {
                    delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
                }
                if w != source {
                    betweenness[w] += delta[w];
                }
            }
        }

        if n > 2 {
            let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
            betweenness.iter_mut().for_each(|b| *b *= scale);
        }
        betweenness
    }

    /// Power iteration; every undirected edge counts in both directions
    fn pagerank(&self) -> Vec<f64> {
        let n = self.len();
        if n == 0 {
            return Vec::new();
        }
        let uniform = 1.0 / n as f64;
        let mut rank = vec![uniform; n];

        for iteration in 0..PAGERANK_MAX_ITERATIONS {
            let mut next = vec![(1.0 - PAGERANK_DAMPING) * uniform; n];
            for (v, neighbours) in self.adjacency.iter().enumerate() {
                if neighbours.is_empty() {
                    continue;
                }
                let share = PAGERANK_DAMPING * rank[v] / neighbours.len() as f64;
                for &w in neighbours {
                    next[w] += share;
                }
            }

            let error: f64 = next.iter().zip(&rank).map(|(a, b)| (a - b).abs()).sum();
            rank = next;
            if error < n as f64 * PAGERANK_TOLERANCE {
                return rank;
            }
            if iteration + 1 == PAGERANK_MAX_ITERATIONS {
                warn!(error, "PageRank did not converge, keeping last iterate");
            }
        }
        rank
    }
}

/// Analytics over a whole store
pub struct GraphAnalytics;

impl GraphAnalytics {
    /// Score every node of the resource graph and record the scores as
    /// double literals (`hasCentralityScore`, `hasBetweennessCentrality`,
    /// `hasPageRank`).
    pub fn compute_centrality(store: &mut GraphStore) -> Vec<NodeCentrality> {
        let graph = NodeGraph::from_store(store);
        let degree = graph.degree_centrality();
        let betweenness = graph.betweenness_centrality();
        let pagerank = graph.pagerank();

        let scores: Vec<NodeCentrality> = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| NodeCentrality {
                node: node.clone(),
                degree: degree[i],
                betweenness: betweenness[i],
                pagerank: pagerank[i],
            })
            .collect();

        for score in &scores {
            store.extend([
                Statement::literal(
                    score.node.clone(),
                    Relation::HasCentralityScore,
                    Literal::Double(Double(score.degree)),
                ),
                Statement::literal(
                    score.node.clone(),
                    Relation::HasBetweennessCentrality,
                    Literal::Double(Double(score.betweenness)),
                ),
                Statement::literal(
                    score.node.clone(),
                    Relation::HasPageRank,
                    Literal::Double(Double(score.pagerank)),
                ),
            ]);
        }

        info!(nodes = graph.len(), edges = graph.edges, "Computed centrality measures");
        scores
    }

    /// Counts per relation and per category (rdf:type memberships)
    pub fn summarize(store: &GraphStore) -> GraphSummary {
        let relation_counts = store
            .relation_counts()
            .into_iter()
            .map(|(relation, count)| (relation.to_string(), count))
            .collect();

        let mut category_counts = BTreeMap::new();
        for statement in store.with_relation(Relation::Type) {
            if let Some(category) = statement.object.as_resource().and_then(Category::from_iri) {
                *category_counts.entry(category.name().to_string()).or_insert(0) += 1;
            }
        }

        let subjects = store
            .iter()
            .map(|s| &s.subject)
            .collect::<BTreeSet<_>>()
            .len();

        GraphSummary {
            statements: store.len(),
            subjects,
            relation_counts,
            category_counts,
        }
    }
}
