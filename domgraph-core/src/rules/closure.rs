// Shared entailment steps for the closure strategies.
//
// Each step reads a snapshot of the store and returns the statements it
// entails that are not already present. Strategies compose steps and feed
// them to `run_to_fixpoint`.

use crate::error::{GraphError, Result};
use crate::graphs::GraphStore;
use crate::schema::{owl_symmetric_property, owl_transitive_property};
use crate::types::*;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Repeat `pass` until it adds nothing. Fails when `max_iterations` passes
/// still produced new statements; whatever was added stays.
pub fn run_to_fixpoint<F>(
    store: &mut GraphStore,
    strategy: &str,
    max_iterations: usize,
    mut pass: F,
) -> Result<usize>
where
    F: FnMut(&GraphStore) -> Vec<Statement>,
{
    let mut total = 0;
    for iteration in 1..=max_iterations {
        let derived = pass(store);
        let added = store.extend(derived);
        total += added;
        debug!(strategy, iteration, added, "Closure pass");
        if added == 0 {
            return Ok(total);
        }
    }
    Err(GraphError::reasoning(
        strategy,
        format!("no fixpoint after {max_iterations} passes ({total} statements added)"),
    ))
}

fn relation_of(iri: &Iri) -> Option<Relation> {
    Relation::from_iri(iri)
}

fn push_new(store: &GraphStore, out: &mut Vec<Statement>, seen: &mut HashSet<Statement>, st: Statement) {
    if !store.contains(&st) && seen.insert(st.clone()) {
        out.push(st);
    }
}

/// Relations declared with `rdf:type <class>`
fn relations_typed(store: &GraphStore, class: &Iri) -> Vec<Relation> {
    store.instances_of(class).filter_map(relation_of).collect()
}

/// Resource pairs of one relation, grouped by subject
fn successors(store: &GraphStore, relation: Relation) -> HashMap<&Iri, Vec<&Iri>> {
    let mut map: HashMap<&Iri, Vec<&Iri>> = HashMap::new();
    for st in store.with_relation(relation) {
        if let Some(object) = st.object.as_resource() {
            map.entry(&st.subject).or_default().push(object);
        }
    }
    map
}

/// (x r y), (y r z) ⊢ (x r z) over one snapshot
pub fn compose(store: &GraphStore, relation: Relation) -> Vec<Statement> {
    let next = successors(store, relation);
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for (x, ys) in &next {
        for y in ys {
            for z in next.get(*y).into_iter().flatten() {
                let st = Statement::new((*x).clone(), relation, (*z).clone());
                push_new(store, &mut out, &mut seen, st);
            }
        }
    }
    out
}

/// rdfs2 / rdfs3 (prp-dom / prp-rng): typing from domain and range
pub fn domain_range(store: &GraphStore) -> Vec<Statement> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();

    for decl in store.with_relation(Relation::Domain) {
        let (Some(relation), Some(class)) = (relation_of(&decl.subject), decl.object.as_resource())
        else {
            continue;
        };
        for st in store.with_relation(relation) {
            let typed = Statement::new(st.subject.clone(), Relation::Type, class.clone());
            push_new(store, &mut out, &mut seen, typed);
        }
    }

    for decl in store.with_relation(Relation::Range) {
        let (Some(relation), Some(class)) = (relation_of(&decl.subject), decl.object.as_resource())
        else {
            continue;
        };
        for st in store.with_relation(relation) {
            if let Some(object) = st.object.as_resource() {
                let typed = Statement::new(object.clone(), Relation::Type, class.clone());
                push_new(store, &mut out, &mut seen, typed);
            }
        }
    }
    out
}

/// rdfs7 (prp-spo1): statements inherit super-properties
pub fn subproperty_inheritance(store: &GraphStore) -> Vec<Statement> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for decl in store.with_relation(Relation::SubPropertyOf) {
        let sub = relation_of(&decl.subject);
        let sup = decl.object.as_resource().and_then(relation_of);
        let (Some(sub), Some(sup)) = (sub, sup) else {
            continue;
        };
        for st in store.with_relation(sub) {
            let lifted = Statement::new(st.subject.clone(), sup, st.object.clone());
            push_new(store, &mut out, &mut seen, lifted);
        }
    }
    out
}

/// rdfs9 (cax-sco): instances of a subclass are instances of the superclass
pub fn subclass_membership(store: &GraphStore) -> Vec<Statement> {
    let supers = successors(store, Relation::SubClassOf);
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for st in store.with_relation(Relation::Type) {
        let Some(class) = st.object.as_resource() else {
            continue;
        };
        for sup in supers.get(class).into_iter().flatten() {
            let typed = Statement::new(st.subject.clone(), Relation::Type, (*sup).clone());
            push_new(store, &mut out, &mut seen, typed);
        }
    }
    out
}

/// cax-eqc1 / cax-eqc2: equivalent classes share instances both ways
pub fn equivalent_class_membership(store: &GraphStore) -> Vec<Statement> {
    let mut equivalents: HashMap<&Iri, Vec<&Iri>> = HashMap::new();
    for decl in store.with_relation(Relation::EquivalentClass) {
        if let Some(other) = decl.object.as_resource() {
            equivalents.entry(&decl.subject).or_default().push(other);
            equivalents.entry(other).or_default().push(&decl.subject);
        }
    }

    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for st in store.with_relation(Relation::Type) {
        let Some(class) = st.object.as_resource() else {
            continue;
        };
        for eq in equivalents.get(class).into_iter().flatten() {
            let typed = Statement::new(st.subject.clone(), Relation::Type, (*eq).clone());
            push_new(store, &mut out, &mut seen, typed);
        }
    }
    out
}

/// prp-symp: symmetric relations hold in reverse
pub fn symmetric(store: &GraphStore) -> Vec<Statement> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for relation in relations_typed(store, &owl_symmetric_property()) {
        for st in store.with_relation(relation) {
            if let Some(object) = st.object.as_resource() {
                let reverse = Statement::new(object.clone(), relation, st.subject.clone());
                push_new(store, &mut out, &mut seen, reverse);
            }
        }
    }
    out
}

/// prp-trp: one composition step for every transitive relation
pub fn transitive(store: &GraphStore) -> Vec<Statement> {
    relations_typed(store, &owl_transitive_property())
        .into_iter()
        .flat_map(|relation| compose(store, relation))
        .collect()
}

/// prp-inv1 / prp-inv2: inverse declarations hold in both directions
pub fn inverses(store: &GraphStore) -> Vec<Statement> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for decl in store.with_relation(Relation::InverseOf) {
        let forward = relation_of(&decl.subject);
        let backward = decl.object.as_resource().and_then(relation_of);
        let (Some(p1), Some(p2)) = (forward, backward) else {
            continue;
        };
        for (from, to) in [(p1, p2), (p2, p1)] {
            for st in store.with_relation(from) {
                if let Some(object) = st.object.as_resource() {
                    let flipped = Statement::new(object.clone(), to, st.subject.clone());
                    push_new(store, &mut out, &mut seen, flipped);
                }
            }
        }
    }
    out
}
