//! Evaluates a parsed [`PatternQuery`] against a [`GraphStore`].
//!
//! Triple patterns are joined left to right by extending partial bindings.
//! Filters run once every pattern has matched; a filter that touches an
//! unbound variable or mixes incompatible values evaluates to false.

use super::parser::*;
use crate::graphs::GraphStore;
use crate::types::*;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

pub type Bindings = BTreeMap<String, Term>;

/// Rows of variable bindings in projection order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResults {
    pub variables: Vec<String>,
    pub rows: Vec<Bindings>,
}

impl QueryResults {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bindings> {
        self.rows.iter()
    }

    /// Values bound to `variable`, skipping rows that left it unbound
    pub fn column<'a>(&'a self, variable: &'a str) -> impl Iterator<Item = &'a Term> + 'a {
        self.rows.iter().filter_map(move |row| row.get(variable))
    }
}

impl PatternQuery {
    pub fn execute(&self, store: &GraphStore) -> QueryResults {
        let mut solutions: Vec<Bindings> = vec![Bindings::new()];
        for pattern in &self.patterns {
            solutions = solutions
                .iter()
                .flat_map(|binding| extend(store, pattern, binding))
                .collect();
            if solutions.is_empty() {
                break;
            }
        }
        debug!(candidates = solutions.len(), "Matched triple patterns");

        let mut regex_cache = RegexCache::default();
        solutions.retain(|binding| {
            self.filters
                .iter()
                .all(|filter| effective_bool(&evaluate(filter, binding, &mut regex_cache)))
        });

        let variables = match &self.projection {
            Projection::All => self.pattern_variables(),
            Projection::Variables(vars) => vars.clone(),
        };

        let mut seen = HashSet::new();
        let mut rows = Vec::new();
        for binding in solutions {
            if self.limit.is_some_and(|limit| rows.len() >= limit) {
                break;
            }
            let row: Bindings = variables
                .iter()
                .filter_map(|v| binding.get(v).map(|t| (v.clone(), t.clone())))
                .collect();
            if self.distinct && !seen.insert(row.clone()) {
                continue;
            }
            rows.push(row);
        }

        QueryResults { variables, rows }
    }
}

/// A pattern position resolved against the current binding
enum Slot<'p> {
    Open(&'p str),
    Fixed(Term),
}

fn slot<'p>(term: &'p PatternTerm, binding: &Bindings) -> Slot<'p> {
    match term {
        PatternTerm::Variable(name) => match binding.get(name) {
            Some(bound) => Slot::Fixed(bound.clone()),
            None => Slot::Open(name),
        },
        PatternTerm::Resource(iri) => Slot::Fixed(Term::Resource(iri.clone())),
        PatternTerm::Literal(lit) => Slot::Fixed(Term::Literal(lit.clone())),
    }
}

fn extend(store: &GraphStore, pattern: &TriplePattern, binding: &Bindings) -> Vec<Bindings> {
    let subject = slot(&pattern.subject, binding);
    let predicate = slot(&pattern.predicate, binding);
    let object = slot(&pattern.object, binding);

    let subject_iri = match &subject {
        Slot::Fixed(Term::Resource(iri)) => Some(iri),
        // Literals never appear in subject position
        Slot::Fixed(Term::Literal(_)) => return Vec::new(),
        Slot::Open(_) => None,
    };
    let relation = match &predicate {
        Slot::Fixed(Term::Resource(iri)) => match Relation::from_iri(iri) {
            Some(relation) => Some(relation),
            None => return Vec::new(),
        },
        Slot::Fixed(Term::Literal(_)) => return Vec::new(),
        Slot::Open(_) => None,
    };
    let object_term = match &object {
        Slot::Fixed(term) => Some(term),
        Slot::Open(_) => None,
    };

    let mut out = Vec::new();
    for statement in store.matching(subject_iri, relation, object_term) {
        let mut next = binding.clone();
        if let Slot::Open(var) = subject {
            next.insert(var.to_string(), Term::Resource(statement.subject.clone()));
        }
        if let Slot::Open(var) = predicate {
            let value = Term::Resource(statement.relation.iri());
            // Same variable used twice in one pattern must agree
            if next.get(var).is_some_and(|existing| *existing != value) {
                continue;
            }
            next.insert(var.to_string(), value);
        }
        if let Slot::Open(var) = object {
            if next.get(var).is_some_and(|existing| *existing != statement.object) {
                continue;
            }
            next.insert(var.to_string(), statement.object.clone());
        }
        out.push(next);
    }
    out
}

// ===== FILTER EVALUATION =====

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Term(Term),
    Str(String),
    Bool(bool),
}

impl Value {
    fn string(&self) -> Option<String> {
        match self {
            Value::Term(term) => Some(term.lexical()),
            Value::Str(s) => Some(s.clone()),
            Value::Bool(_) => None,
        }
    }

    fn number(&self) -> Option<f64> {
        match self {
            Value::Term(Term::Literal(lit)) => match lit {
                Literal::Integer(_) | Literal::Double(_) => lit.as_f64(),
                Literal::String(_) => None,
            },
            _ => None,
        }
    }
}

#[derive(Default)]
struct RegexCache {
    compiled: HashMap<(String, String), Option<Regex>>,
}

impl RegexCache {
    fn get(&mut self, pattern: &str, flags: &str) -> Option<&Regex> {
        self.compiled
            .entry((pattern.to_string(), flags.to_string()))
            .or_insert_with(|| {
                RegexBuilder::new(pattern)
                    .case_insensitive(flags.contains('i'))
                    .multi_line(flags.contains('m'))
                    .dot_matches_new_line(flags.contains('s'))
                    .build()
                    .ok()
            })
            .as_ref()
    }
}

fn effective_bool(value: &Option<Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Str(s)) => !s.is_empty(),
        Some(Value::Term(Term::Literal(lit))) => match lit {
            Literal::String(s) => !s.is_empty(),
            Literal::Integer(i) => *i != 0,
            Literal::Double(d) => d.0 != 0.0 && !d.0.is_nan(),
        },
        Some(Value::Term(Term::Resource(_))) | None => false,
    }
}

fn evaluate(expr: &FilterExpr, binding: &Bindings, cache: &mut RegexCache) -> Option<Value> {
    match expr {
        FilterExpr::Boolean(b) => Some(Value::Bool(*b)),
        FilterExpr::Constant(term) => Some(match term {
            Term::Literal(Literal::String(s)) => Value::Str(s.clone()),
            other => Value::Term(other.clone()),
        }),
        FilterExpr::Variable(name) => binding.get(name).cloned().map(Value::Term),
        FilterExpr::Not(inner) => {
            let value = evaluate(inner, binding, cache)?;
            Some(Value::Bool(!effective_bool(&Some(value))))
        }
        FilterExpr::And(left, right) => Some(Value::Bool(
            effective_bool(&evaluate(left, binding, cache))
                && effective_bool(&evaluate(right, binding, cache)),
        )),
        FilterExpr::Or(left, right) => Some(Value::Bool(
            effective_bool(&evaluate(left, binding, cache))
                || effective_bool(&evaluate(right, binding, cache)),
        )),
        FilterExpr::Compare(op, left, right) => {
            let left = evaluate(left, binding, cache)?;
            let right = evaluate(right, binding, cache)?;
            compare(*op, &left, &right).map(Value::Bool)
        }
        FilterExpr::Call(function, args) => {
            let values = args
                .iter()
                .map(|arg| evaluate(arg, binding, cache))
                .collect::<Option<Vec<_>>>()?;
            call(*function, &values, cache)
        }
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Option<bool> {
    use std::cmp::Ordering;

    let ordering = if let (Some(a), Some(b)) = (left.number(), right.number()) {
        a.partial_cmp(&b)?
    } else {
        match (left, right) {
            (Value::Term(Term::Resource(a)), Value::Term(Term::Resource(b))) => {
                // Resources only support equality
                return match op {
                    CompareOp::Eq => Some(a == b),
                    CompareOp::Ne => Some(a != b),
                    _ => None,
                };
            }
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            _ => left.string()?.cmp(&right.string()?),
        }
    };

    Some(match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
    })
}

fn call(function: Function, args: &[Value], cache: &mut RegexCache) -> Option<Value> {
    let text = args.first()?.string()?;
    let second = || args.get(1).and_then(Value::string);

    Some(match function {
        Function::Str => Value::Str(text),
        Function::Lcase => Value::Str(text.to_lowercase()),
        Function::Ucase => Value::Str(text.to_uppercase()),
        Function::Contains => Value::Bool(text.contains(second()?.as_str())),
        Function::StrStarts => Value::Bool(text.starts_with(second()?.as_str())),
        Function::StrEnds => Value::Bool(text.ends_with(second()?.as_str())),
        Function::Regex => {
            let pattern = second()?;
            let flags = args.get(2).and_then(Value::string).unwrap_or_default();
            Value::Bool(cache.get(&pattern, &flags)?.is_match(&text))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> GraphStore {
        let mut store = GraphStore::new();
        for (id, tag, text, class) in [
            ("h1_1", "h1", "Welcome to the shop", "title"),
            ("p_2", "p", "Price: 25 dollars", "price"),
            ("p_3", "p", "Shipping is free", "price"),
        ] {
            let iri = Iri::ex(id);
            store.insert(Statement::new(iri.clone(), Relation::Type, Category::from_tag(tag).iri()));
            store.insert(Statement::literal(iri.clone(), Relation::HasTag, Literal::string(tag)));
            store.insert(Statement::literal(iri.clone(), Relation::HasText, Literal::string(text)));
            store.insert(Statement::literal(iri, Relation::HasClass, Literal::string(class)));
        }
        store.insert(Statement::literal(Iri::ex("sentence_1"), Relation::TextPosition, Literal::Integer(0)));
        store.insert(Statement::literal(Iri::ex("sentence_2"), Relation::TextPosition, Literal::Integer(1)));
        store
    }

    fn run(text: &str) -> QueryResults {
        PatternQuery::parse(text).unwrap().execute(&store())
    }

    #[test]
    fn contains_filter_finds_price_text() {
        let results = run(
            r#"PREFIX ex: <http://example.org/>
               SELECT ?element ?text WHERE {
                 ?element a ?type .
                 ?element ex:hasText ?text .
                 FILTER(CONTAINS(LCASE(?text), "price"))
               }"#,
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results.rows[0]["element"], Term::Resource(Iri::ex("p_2")));
        assert_eq!(results.variables, vec!["element", "text"]);
    }

    #[test]
    fn join_shares_variables_across_patterns() {
        let results = run(
            r#"SELECT ?other WHERE {
                 ex:p_2 ex:hasClass ?class .
                 ?other ex:hasClass ?class .
               }"#,
        );
        let mut found: Vec<String> = results.column("other").map(|t| t.lexical()).collect();
        found.sort();
        assert_eq!(found, vec!["ex:p_2", "ex:p_3"]);
    }

    #[test]
    fn variable_predicate_binds_relation_iri() {
        let results = run("SELECT DISTINCT ?p WHERE { ex:h1_1 ?p ?o }");
        assert_eq!(results.len(), 4);
        assert!(results
            .column("p")
            .any(|t| *t == Term::Resource(Iri::new("rdf", "type"))));
    }

    #[test]
    fn numeric_comparison_and_limit() {
        let results = run("SELECT ?s WHERE { ?s ex:textPosition ?pos . FILTER(?pos >= 1) }");
        assert_eq!(results.len(), 1);
        let limited = run("SELECT * WHERE { ?s ex:hasTag ?tag } LIMIT 2");
        assert_eq!(limited.len(), 2);
        assert_eq!(limited.variables, vec!["s", "tag"]);
    }

    #[test]
    fn regex_and_boolean_connectives() {
        let results = run(
            r#"SELECT ?e WHERE {
                 ?e ex:hasText ?t .
                 FILTER(REGEX(?t, "^ship", "i") || STRENDS(?t, "shop"))
               }"#,
        );
        assert_eq!(results.len(), 2);
        let negated = run(r#"SELECT ?e WHERE { ?e ex:hasTag ?tag . FILTER(!(?tag = "p")) }"#);
        assert_eq!(negated.len(), 1);
    }

    #[test]
    fn zero_matches_and_unknown_predicates_are_empty_not_errors() {
        assert!(run("SELECT ?s WHERE { ?s ex:hasText \"nothing like this\" }").is_empty());
        assert!(run("SELECT ?s WHERE { ?s ex:notARelation ?o }").is_empty());
    }

    #[test]
    fn unbound_filter_variable_rejects_row() {
        let results = run("SELECT ?s WHERE { ?s ex:hasTag ?tag . FILTER(CONTAINS(?missing, \"x\")) }");
        assert!(results.is_empty());
    }
}
