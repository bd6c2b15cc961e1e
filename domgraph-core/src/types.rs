use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use uuid::Uuid;

/// The schema version stamped on every exported graph.
/// Bump this when the output shape changes.
pub const SCHEMA_VERSION: &str = "0.1.0";

pub const DEFAULT_NAMESPACE: &str = "http://example.org/";
pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const OWL_NS: &str = "http://www.w3.org/2002/07/owl#";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

// ===== IDENTIFIERS =====

/// Compact IRI (`prefix:local`). The `ex` prefix stands for the document
/// namespace, which is only expanded on export.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Iri(Arc<str>);

impl Iri {
    pub fn new(prefix: &str, local: &str) -> Self {
        Self(Arc::from(format!("{prefix}:{local}")))
    }

    /// Node or class in the document namespace
    pub fn ex(local: &str) -> Self {
        Self::new("ex", local)
    }

    /// Wrap an already-compact IRI without validation
    pub fn from_compact(compact: &str) -> Self {
        Self(Arc::from(compact))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn prefix(&self) -> &str {
        self.0.split_once(':').map(|(p, _)| p).unwrap_or("")
    }

    pub fn local(&self) -> &str {
        self.0.split_once(':').map(|(_, l)| l).unwrap_or(&self.0)
    }

    /// Expand to a full IRI. Unknown prefixes are returned untouched.
    pub fn expand(&self, namespace: &str) -> String {
        match namespace_for_prefix(self.prefix(), namespace) {
            Some(ns) => format!("{ns}{}", self.local()),
            None => self.0.to_string(),
        }
    }

    /// Inverse of [`Iri::expand`] for the known namespaces
    pub fn compact_from(full: &str, namespace: &str) -> Option<Self> {
        [("rdf", RDF_NS), ("rdfs", RDFS_NS), ("owl", OWL_NS), ("xsd", XSD_NS), ("ex", namespace)]
            .iter()
            .find_map(|(prefix, ns)| full.strip_prefix(ns).map(|local| Self::new(prefix, local)))
    }
}

pub fn namespace_for_prefix<'a>(prefix: &str, namespace: &'a str) -> Option<&'a str> {
    match prefix {
        "rdf" => Some(RDF_NS),
        "rdfs" => Some(RDFS_NS),
        "owl" => Some(OWL_NS),
        "xsd" => Some(XSD_NS),
        "ex" => Some(namespace),
        _ => None,
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

impl Serialize for Iri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Iri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let compact = String::deserialize(deserializer)?;
        Ok(Self(Arc::from(compact)))
    }
}

// ===== LITERALS =====

/// f64 with total ordering so literals can live in hashed sets
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Double(pub f64);

impl PartialEq for Double {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Double {}

impl Hash for Double {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for Double {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Double {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    String(String),
    Integer(i64),
    Double(Double),
}

impl Literal {
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn lexical(&self) -> String {
        match self {
            Literal::String(s) => s.clone(),
            Literal::Integer(i) => i.to_string(),
            Literal::Double(d) => d.0.to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::String(s) => s.trim().parse().ok(),
            Literal::Integer(i) => Some(*i as f64),
            Literal::Double(d) => Some(d.0),
        }
    }

    pub fn datatype(&self) -> &'static str {
        match self {
            Literal::String(_) => "xsd:string",
            Literal::Integer(_) => "xsd:integer",
            Literal::Double(_) => "xsd:double",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "{s:?}"),
            other => f.write_str(&other.lexical()),
        }
    }
}

/// Statement object: a node identifier or a literal scalar
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    Resource(Iri),
    Literal(Literal),
}

impl Term {
    pub fn as_resource(&self) -> Option<&Iri> {
        match self {
            Term::Resource(iri) => Some(iri),
            Term::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            Term::Resource(_) => None,
        }
    }

    /// String view used by filters: literal lexical form or compact IRI
    pub fn lexical(&self) -> String {
        match self {
            Term::Resource(iri) => iri.to_string(),
            Term::Literal(lit) => lit.lexical(),
        }
    }
}

impl From<Iri> for Term {
    fn from(iri: Iri) -> Self {
        Term::Resource(iri)
    }
}

impl From<Literal> for Term {
    fn from(lit: Literal) -> Self {
        Term::Literal(lit)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Resource(iri) => write!(f, "{iri}"),
            Term::Literal(lit) => write!(f, "{lit}"),
        }
    }
}

// ===== VOCABULARY =====

/// The fixed relation vocabulary. Schema relations (rdf/rdfs/owl) live in the
/// same enum so closure rules can treat every statement uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Relation {
    // Structure
    HasChild,
    IsChildOf,
    Contains,
    IsContainedIn,
    HasSibling,
    HasSimilarPurposeTo,
    // Element data
    HasTag,
    HasText,
    HasClass,
    HasId,
    HasHref,
    HasValue,
    HasAttribute,
    // Text decomposition
    HasTextContent,
    HasSegment,
    RawText,
    TextPosition,
    Content,
    // Page
    Url,
    Title,
    // Analytics
    HasCentralityScore,
    HasBetweennessCentrality,
    HasPageRank,
    // Schema
    Type,
    SubClassOf,
    SubPropertyOf,
    Domain,
    Range,
    InverseOf,
    EquivalentClass,
}

impl Relation {
    pub const ALL: [Relation; 30] = [
        Relation::HasChild,
        Relation::IsChildOf,
        Relation::Contains,
        Relation::IsContainedIn,
        Relation::HasSibling,
        Relation::HasSimilarPurposeTo,
        Relation::HasTag,
        Relation::HasText,
        Relation::HasClass,
        Relation::HasId,
        Relation::HasHref,
        Relation::HasValue,
        Relation::HasAttribute,
        Relation::HasTextContent,
        Relation::HasSegment,
        Relation::RawText,
        Relation::TextPosition,
        Relation::Content,
        Relation::Url,
        Relation::Title,
        Relation::HasCentralityScore,
        Relation::HasBetweennessCentrality,
        Relation::HasPageRank,
        Relation::Type,
        Relation::SubClassOf,
        Relation::SubPropertyOf,
        Relation::Domain,
        Relation::Range,
        Relation::InverseOf,
        Relation::EquivalentClass,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Relation::Type => "rdf",
            Relation::SubClassOf | Relation::SubPropertyOf | Relation::Domain | Relation::Range => {
                "rdfs"
            }
            Relation::InverseOf | Relation::EquivalentClass => "owl",
            _ => "ex",
        }
    }

    pub fn local_name(self) -> &'static str {
        match self {
            Relation::HasChild => "hasChild",
            Relation::IsChildOf => "isChildOf",
            Relation::Contains => "contains",
            Relation::IsContainedIn => "isContainedIn",
            Relation::HasSibling => "hasSibling",
            Relation::HasSimilarPurposeTo => "hasSimilarPurposeTo",
            Relation::HasTag => "hasTag",
            Relation::HasText => "hasText",
            Relation::HasClass => "hasClass",
            Relation::HasId => "hasId",
            Relation::HasHref => "hasHref",
            Relation::HasValue => "hasValue",
            Relation::HasAttribute => "hasAttribute",
            Relation::HasTextContent => "hasTextContent",
            Relation::HasSegment => "hasSegment",
            Relation::RawText => "rawText",
            Relation::TextPosition => "textPosition",
            Relation::Content => "content",
            Relation::Url => "url",
            Relation::Title => "title",
            Relation::HasCentralityScore => "hasCentralityScore",
            Relation::HasBetweennessCentrality => "hasBetweennessCentrality",
            Relation::HasPageRank => "hasPageRank",
            Relation::Type => "type",
            Relation::SubClassOf => "subClassOf",
            Relation::SubPropertyOf => "subPropertyOf",
            Relation::Domain => "domain",
            Relation::Range => "range",
            Relation::InverseOf => "inverseOf",
            Relation::EquivalentClass => "equivalentClass",
        }
    }

    pub fn iri(self) -> Iri {
        Iri::new(self.prefix(), self.local_name())
    }

    pub fn from_iri(iri: &Iri) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|rel| rel.prefix() == iri.prefix() && rel.local_name() == iri.local())
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix(), self.local_name())
    }
}

/// Node categories. The four element subtypes are subclasses of `Element`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Element,
    TextElement,
    StructuralElement,
    LinkElement,
    FormElement,
    Page,
    TextContent,
    TextSegment,
}

const TEXT_TAGS: &[&str] = &[
    "p", "span", "h1", "h2", "h3", "h4", "h5", "h6", "strong", "em", "blockquote", "pre", "code",
];
const LINK_TAGS: &[&str] = &["a", "link", "button"];
const FORM_TAGS: &[&str] = &["form", "input", "select", "textarea", "button", "label", "option"];
const STRUCTURAL_TAGS: &[&str] = &[
    "div", "section", "article", "aside", "header", "footer", "nav", "main", "ul", "ol", "li",
    "table", "tr", "td", "th",
];

impl Category {
    pub const ELEMENT_SUBTYPES: [Category; 4] = [
        Category::TextElement,
        Category::StructuralElement,
        Category::LinkElement,
        Category::FormElement,
    ];

    pub const ALL: [Category; 8] = [
        Category::Element,
        Category::TextElement,
        Category::StructuralElement,
        Category::LinkElement,
        Category::FormElement,
        Category::Page,
        Category::TextContent,
        Category::TextSegment,
    ];

    /// Category from tag name. Pure function of the (case-folded) tag; the
    /// first matching list wins, so `button` is a link element.
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.to_ascii_lowercase();
        let tag = tag.as_str();
        if TEXT_TAGS.contains(&tag) {
            Category::TextElement
        } else if LINK_TAGS.contains(&tag) {
            Category::LinkElement
        } else if FORM_TAGS.contains(&tag) {
            Category::FormElement
        } else if STRUCTURAL_TAGS.contains(&tag) {
            Category::StructuralElement
        } else {
            Category::Element
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::Element => "Element",
            Category::TextElement => "TextElement",
            Category::StructuralElement => "StructuralElement",
            Category::LinkElement => "LinkElement",
            Category::FormElement => "FormElement",
            Category::Page => "Page",
            Category::TextContent => "TextContent",
            Category::TextSegment => "TextSegment",
        }
    }

    pub fn iri(self) -> Iri {
        Iri::ex(self.name())
    }

    pub fn from_iri(iri: &Iri) -> Option<Self> {
        if iri.prefix() != "ex" {
            return None;
        }
        Self::ALL.iter().copied().find(|c| c.name() == iri.local())
    }
}

// ===== STATEMENTS =====

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Statement {
    pub subject: Iri,
    pub relation: Relation,
    pub object: Term,
}

impl Statement {
    pub fn new(subject: Iri, relation: Relation, object: impl Into<Term>) -> Self {
        Self {
            subject,
            relation,
            object: object.into(),
        }
    }

    pub fn literal(subject: Iri, relation: Relation, value: Literal) -> Self {
        Self::new(subject, relation, Term::Literal(value))
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.relation, self.object)
    }
}

// ===== METADATA & REPORTS =====

/// Non-statement information about one store. `build_id` and `created_at`
/// differ between otherwise identical builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub build_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub namespace: String,
    pub source_url: Option<String>,
    /// SHA-256 of the markup the tree was parsed from, if known
    pub markup_hash: Option<String>,
    pub config_hash: Option<String>,
}

impl GraphMetadata {
    pub fn new(namespace: &str) -> Self {
        Self {
            build_id: Uuid::new_v4(),
            created_at: Utc::now(),
            namespace: namespace.to_string(),
            source_url: None,
            markup_hash: None,
            config_hash: None,
        }
    }
}

impl Default for GraphMetadata {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

/// Serialization-ready output format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedGraph {
    pub schema_version: String,
    pub metadata: GraphMetadata,
    pub statement_count: usize,
    pub fingerprint: String,
    pub statements: Vec<Statement>,
}

/// What one builder call produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub page: Iri,
    pub roots: Vec<Iri>,
    pub elements: usize,
    pub text_contents: usize,
    pub text_segments: usize,
    pub max_depth: usize,
    pub statements_added: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_is_pure_function_of_tag() {
        assert_eq!(Category::from_tag("p"), Category::TextElement);
        assert_eq!(Category::from_tag("P"), Category::TextElement);
        assert_eq!(Category::from_tag("div"), Category::StructuralElement);
        assert_eq!(Category::from_tag("button"), Category::LinkElement);
        assert_eq!(Category::from_tag("input"), Category::FormElement);
        assert_eq!(Category::from_tag("blink"), Category::Element);
        assert_eq!(Category::from_tag("html"), Category::Element);
    }

    #[test]
    fn relation_iri_roundtrips_through_vocabulary() {
        for rel in Relation::ALL {
            assert_eq!(Relation::from_iri(&rel.iri()), Some(rel));
        }
        assert_eq!(Relation::Type.iri().as_str(), "rdf:type");
        assert_eq!(Relation::from_iri(&Iri::ex("notARelation")), None);
    }

    #[test]
    fn iri_expands_and_compacts() {
        let iri = Iri::ex("element_2_div");
        let full = iri.expand("http://example.org/");
        assert_eq!(full, "http://example.org/element_2_div");
        assert_eq!(Iri::compact_from(&full, "http://example.org/"), Some(iri));
        assert_eq!(
            Relation::SubClassOf.iri().expand(DEFAULT_NAMESPACE),
            "http://www.w3.org/2000/01/rdf-schema#subClassOf"
        );
    }

    #[test]
    fn doubles_are_hashable_and_ordered() {
        let a = Literal::Double(Double(0.25));
        let b = Literal::Double(Double(0.5));
        assert!(a < b);
        assert_eq!(a, Literal::Double(Double(0.25)));
    }
}
