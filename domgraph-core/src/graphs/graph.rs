use crate::hashing::calculate_statement_fingerprint;
use crate::types::*;
use std::collections::{HashMap, HashSet};

/// The mutable statement set for one document.
///
/// Additive only: there is no removal API, so every pass can rely on the
/// statements it saw earlier still being present. Insertion order is kept
/// and is the iteration order everywhere (search ties, exports).
#[derive(Debug, Clone)]
pub struct GraphStore {
    statements: Vec<Statement>,
    seen: HashSet<Statement>,
    by_relation: HashMap<Relation, Vec<usize>>,
    by_subject: HashMap<Iri, Vec<usize>>,
    metadata: GraphMetadata,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::with_namespace(DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(namespace: &str) -> Self {
        Self {
            statements: Vec::new(),
            seen: HashSet::new(),
            by_relation: HashMap::new(),
            by_subject: HashMap::new(),
            metadata: GraphMetadata::new(namespace),
        }
    }

    /// Add one statement. Returns false if it was already present.
    pub fn insert(&mut self, statement: Statement) -> bool {
        if self.seen.contains(&statement) {
            return false;
        }
        let index = self.statements.len();
        self.by_relation
            .entry(statement.relation)
            .or_default()
            .push(index);
        self.by_subject
            .entry(statement.subject.clone())
            .or_default()
            .push(index);
        self.seen.insert(statement.clone());
        self.statements.push(statement);
        true
    }

    /// Add many statements, returning how many were new
    pub fn extend<I: IntoIterator<Item = Statement>>(&mut self, statements: I) -> usize {
        statements
            .into_iter()
            .map(|s| self.insert(s))
            .filter(|added| *added)
            .count()
    }

    /// Record a parent/child edge. Both inverse pairs
    /// (hasChild/isChildOf, contains/isContainedIn) go in together.
    pub fn link_parent_child(&mut self, parent: &Iri, child: &Iri) -> usize {
        self.extend([
            Statement::new(parent.clone(), Relation::HasChild, child.clone()),
            Statement::new(child.clone(), Relation::IsChildOf, parent.clone()),
            Statement::new(parent.clone(), Relation::Contains, child.clone()),
            Statement::new(child.clone(), Relation::IsContainedIn, parent.clone()),
        ])
    }

    pub fn contains(&self, statement: &Statement) -> bool {
        self.seen.contains(statement)
    }

    pub fn has(&self, subject: &Iri, relation: Relation, object: impl Into<Term>) -> bool {
        self.seen
            .contains(&Statement::new(subject.clone(), relation, object))
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.statements.iter()
    }

    /// Statements with the given relation, in insertion order
    pub fn with_relation(&self, relation: Relation) -> impl Iterator<Item = &Statement> + '_ {
        self.by_relation
            .get(&relation)
            .into_iter()
            .flatten()
            .map(move |&i| &self.statements[i])
    }

    /// Statements whose subject is `subject`, in insertion order
    pub fn about<'a>(&'a self, subject: &Iri) -> impl Iterator<Item = &'a Statement> + 'a {
        self.by_subject
            .get(subject)
            .into_iter()
            .flatten()
            .map(move |&i| &self.statements[i])
    }

    pub fn objects<'a>(
        &'a self,
        subject: &Iri,
        relation: Relation,
    ) -> impl Iterator<Item = &'a Term> + 'a {
        self.about(subject)
            .filter(move |s| s.relation == relation)
            .map(|s| &s.object)
    }

    /// Subjects typed (directly or by inference) with `class`
    pub fn instances_of<'a>(&'a self, class: &'a Iri) -> impl Iterator<Item = &'a Iri> + 'a {
        self.with_relation(Relation::Type)
            .filter(move |s| s.object.as_resource() == Some(class))
            .map(|s| &s.subject)
    }

    /// Pattern match with optional positions, the primitive the query
    /// executor is built on. Picks the narrowest index available.
    pub fn matching<'a>(
        &'a self,
        subject: Option<&'a Iri>,
        relation: Option<Relation>,
        object: Option<&'a Term>,
    ) -> Box<dyn Iterator<Item = &'a Statement> + 'a> {
        let candidates: Box<dyn Iterator<Item = &'a Statement> + 'a> = match (subject, relation) {
            (Some(s), _) => Box::new(self.about(s)),
            (None, Some(r)) => Box::new(self.with_relation(r)),
            (None, None) => Box::new(self.statements.iter()),
        };
        Box::new(candidates.filter(move |st| {
            relation.map_or(true, |r| st.relation == r) && object.map_or(true, |o| st.object == *o)
        }))
    }

    pub fn metadata(&self) -> &GraphMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut GraphMetadata {
        &mut self.metadata
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    /// SHA-256 over the sorted statement set. Metadata is ignored, so two
    /// builds of the same input agree.
    pub fn fingerprint(&self) -> String {
        calculate_statement_fingerprint(&self.statements)
    }

    pub fn relation_counts(&self) -> HashMap<Relation, usize> {
        self.by_relation
            .iter()
            .map(|(relation, indices)| (*relation, indices.len()))
            .collect()
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a GraphStore {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut store = GraphStore::new();
        let st = Statement::literal(Iri::ex("p1"), Relation::HasTag, Literal::string("p"));
        assert!(store.insert(st.clone()));
        assert!(!store.insert(st));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn parent_child_link_records_both_pairs() {
        let mut store = GraphStore::new();
        let (parent, child) = (Iri::ex("div_a"), Iri::ex("element_3_p"));
        assert_eq!(store.link_parent_child(&parent, &child), 4);
        assert!(store.has(&parent, Relation::HasChild, child.clone()));
        assert!(store.has(&child, Relation::IsChildOf, parent.clone()));
        assert!(store.has(&parent, Relation::Contains, child.clone()));
        assert!(store.has(&child, Relation::IsContainedIn, parent.clone()));
        assert_eq!(store.link_parent_child(&parent, &child), 0);
    }

    #[test]
    fn matching_uses_any_bound_position() {
        let mut store = GraphStore::new();
        store.link_parent_child(&Iri::ex("a"), &Iri::ex("b"));
        store.link_parent_child(&Iri::ex("b"), &Iri::ex("c"));
        let c = Term::Resource(Iri::ex("c"));
        let hits: Vec<_> = store
            .matching(None, Some(Relation::HasChild), Some(&c))
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].subject, Iri::ex("b"));
        assert_eq!(store.matching(None, None, None).count(), 8);
    }

    #[test]
    fn fingerprint_ignores_metadata_and_order() {
        let mut first = GraphStore::new();
        let mut second = GraphStore::new();
        first.link_parent_child(&Iri::ex("a"), &Iri::ex("b"));
        first.link_parent_child(&Iri::ex("b"), &Iri::ex("c"));
        second.link_parent_child(&Iri::ex("b"), &Iri::ex("c"));
        second.link_parent_child(&Iri::ex("a"), &Iri::ex("b"));
        assert_ne!(first.metadata().build_id, second.metadata().build_id);
        assert_eq!(first.fingerprint(), second.fingerprint());
    }
}
