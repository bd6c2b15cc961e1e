use crate::error::Result;
use crate::types::Statement;
use sha2::{Digest, Sha256};

/// Hash of the raw markup a tree was parsed from
pub fn calculate_markup_hash(markup: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(markup.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash for configuration data, via its canonical JSON form
pub fn calculate_config_hash<T: serde::Serialize>(config: &T) -> Result<String> {
    let config_json = serde_json::to_string(config)?;

    let mut hasher = Sha256::new();
    hasher.update(config_json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Order-independent digest of a statement set.
///
/// Statements are sorted before hashing, one per line, so two stores holding
/// the same set produce the same digest regardless of insertion order.
pub fn calculate_statement_fingerprint<'a, I>(statements: I) -> String
where
    I: IntoIterator<Item = &'a Statement>,
{
    let mut sorted: Vec<&Statement> = statements.into_iter().collect();
    sorted.sort();

    let mut hasher = Sha256::new();
    hasher.update(sorted.len().to_le_bytes());
    for statement in sorted {
        hasher.update(statement.to_string().as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Iri, Literal, Relation};

    #[test]
    fn test_markup_hash_consistency() {
        let markup = "<html><body><p>Hello</p></body></html>";
        assert_eq!(calculate_markup_hash(markup), calculate_markup_hash(markup));
        assert_ne!(calculate_markup_hash(markup), calculate_markup_hash("<p>Hello</p>"));
    }

    #[test]
    fn test_fingerprint_ignores_order() {
        let a = Statement::new(Iri::ex("a"), Relation::HasChild, Iri::ex("b"));
        let b = Statement::literal(Iri::ex("a"), Relation::HasTag, Literal::string("div"));
        let forward = calculate_statement_fingerprint([&a, &b]);
        let backward = calculate_statement_fingerprint([&b, &a]);
        assert_eq!(forward, backward);
        assert_ne!(forward, calculate_statement_fingerprint([&a]));
    }
}
