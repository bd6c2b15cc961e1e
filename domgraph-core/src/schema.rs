//! Fixed vocabulary declarations: categories, subclass edges and the
//! algebraic tags of each relation. Loaded once, immutable afterward.

use crate::graphs::GraphStore;
use crate::types::{Category, Iri, Relation, Statement};
use std::collections::HashMap;

pub fn owl_class() -> Iri {
    Iri::new("owl", "Class")
}

pub fn owl_transitive_property() -> Iri {
    Iri::new("owl", "TransitiveProperty")
}

pub fn owl_symmetric_property() -> Iri {
    Iri::new("owl", "SymmetricProperty")
}

pub fn owl_object_property() -> Iri {
    Iri::new("owl", "ObjectProperty")
}

pub fn owl_datatype_property() -> Iri {
    Iri::new("owl", "DatatypeProperty")
}

const TRANSITIVE: &[Relation] = &[Relation::HasChild];

const SYMMETRIC: &[Relation] = &[Relation::HasSibling, Relation::HasSimilarPurposeTo];

const OBJECT_PROPERTIES: &[Relation] = &[
    Relation::HasChild,
    Relation::IsChildOf,
    Relation::Contains,
    Relation::IsContainedIn,
    Relation::HasSibling,
    Relation::HasSimilarPurposeTo,
    Relation::HasTextContent,
    Relation::HasSegment,
];

const DATATYPE_PROPERTIES: &[Relation] = &[
    Relation::HasTag,
    Relation::HasText,
    Relation::HasClass,
    Relation::HasId,
    Relation::HasHref,
    Relation::HasValue,
    Relation::HasAttribute,
    Relation::RawText,
    Relation::TextPosition,
    Relation::Content,
    Relation::Url,
    Relation::Title,
    Relation::HasCentralityScore,
    Relation::HasBetweennessCentrality,
    Relation::HasPageRank,
];

const INVERSES: &[(Relation, Relation)] = &[
    (Relation::HasChild, Relation::IsChildOf),
    (Relation::Contains, Relation::IsContainedIn),
];

// (relation, domain, range)
const DOMAIN_RANGE: &[(Relation, Category, Category)] = &[
    (Relation::HasChild, Category::Element, Category::Element),
    (Relation::HasSibling, Category::Element, Category::Element),
];

#[derive(Debug, Clone)]
pub struct Schema {
    statements: Vec<Statement>,
    superclasses: HashMap<Category, Vec<Category>>,
}

impl Schema {
    /// Build the schema. Pure and deterministic: the same statements in the
    /// same order on every call.
    pub fn load() -> Self {
        let mut statements = Vec::new();

        for category in Category::ALL {
            statements.push(Statement::new(category.iri(), Relation::Type, owl_class()));
        }

        let mut superclasses = HashMap::new();
        for sub in Category::ELEMENT_SUBTYPES {
            statements.push(Statement::new(
                sub.iri(),
                Relation::SubClassOf,
                Category::Element.iri(),
            ));
            superclasses.insert(sub, vec![Category::Element]);
        }

        for rel in TRANSITIVE {
            statements.push(Statement::new(rel.iri(), Relation::Type, owl_transitive_property()));
        }
        for rel in SYMMETRIC {
            statements.push(Statement::new(rel.iri(), Relation::Type, owl_symmetric_property()));
        }
        for rel in OBJECT_PROPERTIES {
            statements.push(Statement::new(rel.iri(), Relation::Type, owl_object_property()));
        }
        for rel in DATATYPE_PROPERTIES {
            statements.push(Statement::new(rel.iri(), Relation::Type, owl_datatype_property()));
        }
        for (rel, inverse) in INVERSES {
            statements.push(Statement::new(rel.iri(), Relation::InverseOf, inverse.iri()));
        }
        for (rel, domain, range) in DOMAIN_RANGE {
            statements.push(Statement::new(rel.iri(), Relation::Domain, domain.iri()));
            statements.push(Statement::new(rel.iri(), Relation::Range, range.iri()));
        }

        Self {
            statements,
            superclasses,
        }
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Record the declarations in a store so they are queryable and visible
    /// to the closure strategies. Returns the number of new statements.
    pub fn write_into(&self, store: &mut GraphStore) -> usize {
        store.extend(self.statements.iter().cloned())
    }

    pub fn is_transitive(&self, relation: Relation) -> bool {
        TRANSITIVE.contains(&relation)
    }

    pub fn is_symmetric(&self, relation: Relation) -> bool {
        SYMMETRIC.contains(&relation)
    }

    pub fn inverse_of(&self, relation: Relation) -> Option<Relation> {
        INVERSES.iter().find_map(|(a, b)| {
            if *a == relation {
                Some(*b)
            } else if *b == relation {
                Some(*a)
            } else {
                None
            }
        })
    }

    /// Direct superclasses of a category
    pub fn superclasses(&self, category: Category) -> &[Category] {
        self.superclasses
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_is_deterministic() {
        assert_eq!(Schema::load().statements(), Schema::load().statements());
    }

    #[test]
    fn typed_lookups() {
        let schema = Schema::load();
        assert!(schema.is_transitive(Relation::HasChild));
        assert!(!schema.is_transitive(Relation::Contains));
        assert!(schema.is_symmetric(Relation::HasSibling));
        assert_eq!(schema.inverse_of(Relation::IsContainedIn), Some(Relation::Contains));
        assert_eq!(schema.inverse_of(Relation::HasTag), None);
        assert_eq!(schema.superclasses(Category::LinkElement), &[Category::Element]);
        assert!(schema.superclasses(Category::Page).is_empty());
    }

    #[test]
    fn write_into_is_queryable() {
        let schema = Schema::load();
        let mut store = GraphStore::new();
        let added = schema.write_into(&mut store);
        assert_eq!(added, schema.statements().len());
        assert!(store.has(
            &Category::FormElement.iri(),
            Relation::SubClassOf,
            Category::Element.iri()
        ));
        assert!(store.has(
            &Relation::HasChild.iri(),
            Relation::InverseOf,
            Relation::IsChildOf.iri()
        ));
        assert_eq!(schema.write_into(&mut store), 0);
    }
}
