use super::graph::GraphStore;
use crate::error::Result;
use crate::types::*;
use std::fmt::Write as _;
use tracing::{info, warn};

fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn ntriples_term(term: &Term, namespace: &str) -> String {
    match term {
        Term::Resource(iri) => format!("<{}>", iri.expand(namespace)),
        Term::Literal(Literal::String(s)) => format!("\"{}\"", escape_literal(s)),
        Term::Literal(lit) => format!(
            "\"{}\"^^<{}>",
            lit.lexical(),
            Iri::from_compact(lit.datatype()).expand(namespace)
        ),
    }
}

impl GraphStore {
    /// One line per statement, compact IRIs expanded against `namespace`
    pub fn to_ntriples(&self, namespace: &str) -> String {
        let mut out = String::new();
        for statement in self {
            // Writing to a String cannot fail
            let _ = writeln!(
                out,
                "<{}> <{}> {} .",
                statement.subject.expand(namespace),
                statement.relation.iri().expand(namespace),
                ntriples_term(&statement.object, namespace)
            );
        }
        out
    }

    pub fn to_serialized(&self) -> SerializedGraph {
        SerializedGraph {
            schema_version: SCHEMA_VERSION.to_string(),
            metadata: self.metadata().clone(),
            statement_count: self.len(),
            fingerprint: self.fingerprint(),
            statements: self.statements().to_vec(),
        }
    }

    pub fn save_to_json(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_serialized())?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn save_with_format(&self, path: &str, format: &str) -> Result<()> {
        match format {
            "ntriples" | "nt" => {
                std::fs::write(path, self.to_ntriples(self.namespace()))?;
            }
            "json" => {
                self.save_to_json(path)?;
            }
            other => {
                warn!(format = other, "Unknown output format, writing JSON");
                self.save_to_json(path)?;
            }
        }
        info!(path, format, statements = self.len(), "Saved graph");
        Ok(())
    }
}
