use super::engine::InferenceRule;
use crate::error::Result;
use crate::graphs::GraphStore;
use crate::types::{Iri, Relation, Statement};
use std::collections::HashMap;
use tracing::debug;

/// Elements sharing a `hasClass` value get `hasSimilarPurposeTo` in both
/// directions, for every unordered pair of distinct subjects.
pub struct ClassSimilarityRule;

impl ClassSimilarityRule {
    /// Subjects per class value, both in first-seen order
    fn groups(store: &GraphStore) -> Vec<(String, Vec<Iri>)> {
        let mut groups: Vec<(String, Vec<Iri>)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for st in store.with_relation(Relation::HasClass) {
            let class = st.object.lexical();
            let slot = *index.entry(class.clone()).or_insert_with(|| {
                groups.push((class, Vec::new()));
                groups.len() - 1
            });
            let members = &mut groups[slot].1;
            if !members.contains(&st.subject) {
                members.push(st.subject.clone());
            }
        }
        groups
    }
}

impl InferenceRule for ClassSimilarityRule {
    fn apply(&self, store: &mut GraphStore) -> Result<usize> {
        let mut derived = Vec::new();
        for (class, members) in Self::groups(store) {
            if members.len() < 2 {
                continue;
            }
            debug!(class = %class, members = members.len(), "Similar-purpose group");
            for (i, first) in members.iter().enumerate() {
                for second in &members[i + 1..] {
                    derived.push(Statement::new(
                        first.clone(),
                        Relation::HasSimilarPurposeTo,
                        second.clone(),
                    ));
                    derived.push(Statement::new(
                        second.clone(),
                        Relation::HasSimilarPurposeTo,
                        first.clone(),
                    ));
                }
            }
        }
        Ok(store.extend(derived))
    }

    fn name(&self) -> &str {
        "ClassSimilarity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Literal;

    fn classed(store: &mut GraphStore, subject: &str, class: &str) {
        store.insert(Statement::literal(
            Iri::ex(subject),
            Relation::HasClass,
            Literal::string(class),
        ));
    }

    #[test]
    fn pairs_every_member_of_a_shared_class() {
        let mut store = GraphStore::new();
        classed(&mut store, "a", "card");
        classed(&mut store, "b", "card");
        classed(&mut store, "c", "card");
        classed(&mut store, "a", "featured");
        classed(&mut store, "d", "solo");

        let added = ClassSimilarityRule.apply(&mut store).unwrap();
        assert_eq!(added, 6);
        assert!(store.has(&Iri::ex("c"), Relation::HasSimilarPurposeTo, Iri::ex("a")));
        assert!(!store.has(&Iri::ex("a"), Relation::HasSimilarPurposeTo, Iri::ex("a")));
        assert!(!store.has(&Iri::ex("d"), Relation::HasSimilarPurposeTo, Iri::ex("a")));

        assert_eq!(ClassSimilarityRule.apply(&mut store).unwrap(), 0);
    }
}
