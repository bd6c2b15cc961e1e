//! Lexer and recursive-descent parser for the pattern query language.
//!
//! ```text
//! PREFIX ex: <http://example.org/>
//! SELECT [DISTINCT] ?element ?text | *
//! WHERE {
//!   ?element a ?type .
//!   ?element ex:hasText ?text .
//!   FILTER(CONTAINS(LCASE(?text), "price"))
//! }
//! [LIMIT n]
//! ```

use crate::error::{GraphError, Result};
use crate::types::*;
use std::collections::HashMap;

// ===== AST =====

#[derive(Debug, Clone, PartialEq)]
pub enum PatternTerm {
    Variable(String),
    Resource(Iri),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriplePattern {
    pub subject: PatternTerm,
    pub predicate: PatternTerm,
    pub object: PatternTerm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Contains,
    Lcase,
    Ucase,
    Str,
    StrStarts,
    StrEnds,
    Regex,
}

impl Function {
    fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "CONTAINS" => Some(Function::Contains),
            "LCASE" => Some(Function::Lcase),
            "UCASE" => Some(Function::Ucase),
            "STR" => Some(Function::Str),
            "STRSTARTS" => Some(Function::StrStarts),
            "STRENDS" => Some(Function::StrEnds),
            "REGEX" => Some(Function::Regex),
            _ => None,
        }
    }

    fn arity(self) -> (usize, usize) {
        match self {
            Function::Lcase | Function::Ucase | Function::Str => (1, 1),
            Function::Contains | Function::StrStarts | Function::StrEnds => (2, 2),
            Function::Regex => (2, 3),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Or(Box<FilterExpr>, Box<FilterExpr>),
    And(Box<FilterExpr>, Box<FilterExpr>),
    Not(Box<FilterExpr>),
    Compare(CompareOp, Box<FilterExpr>, Box<FilterExpr>),
    Call(Function, Vec<FilterExpr>),
    Variable(String),
    Constant(Term),
    Boolean(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    All,
    Variables(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternQuery {
    pub distinct: bool,
    pub projection: Projection,
    pub patterns: Vec<TriplePattern>,
    pub filters: Vec<FilterExpr>,
    pub limit: Option<usize>,
}

impl PatternQuery {
    pub fn parse(text: &str) -> Result<Self> {
        let tokens = Lexer::new(text).tokenize()?;
        Parser::new(tokens, text.len()).parse_query()
    }

    /// Variables in order of first appearance in the WHERE patterns
    pub fn pattern_variables(&self) -> Vec<String> {
        let mut vars: Vec<String> = Vec::new();
        for pattern in &self.patterns {
            for term in [&pattern.subject, &pattern.predicate, &pattern.object] {
                if let PatternTerm::Variable(name) = term {
                    if !vars.contains(name) {
                        vars.push(name.clone());
                    }
                }
            }
        }
        vars
    }
}

// ===== LEXER =====

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    PrefixedName(String, String),
    Variable(String),
    IriRef(String),
    Str(String),
    Integer(i64),
    Decimal(f64),
    LBrace,
    RBrace,
    LParen,
    RParen,
    Dot,
    Comma,
    Star,
    Compare(CompareOp),
    AndAnd,
    OrOr,
    Bang,
}

struct Lexer<'q> {
    text: &'q str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'q> Lexer<'q> {
    fn new(text: &'q str) -> Self {
        Self {
            text,
            chars: text.char_indices().collect(),
            pos: 0,
        }
    }

    fn offset(&self) -> usize {
        self.chars.get(self.pos).map_or(self.text.len(), |(b, _)| *b)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if !keep(c) {
                break;
            }
            out.push(c);
            self.pos += 1;
        }
        out
    }

    fn tokenize(mut self) -> Result<Vec<(usize, Token)>> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            let start = self.offset();
            if c.is_whitespace() {
                self.pos += 1;
                continue;
            }
            if c == '#' {
                // Comment to end of line
                self.take_while(|c| c != '\n');
                continue;
            }
            let token = match c {
                '{' => self.single(Token::LBrace),
                '}' => self.single(Token::RBrace),
                '(' => self.single(Token::LParen),
                ')' => self.single(Token::RParen),
                '.' if !self.peek_at(1).is_some_and(|n| n.is_ascii_digit()) => {
                    self.single(Token::Dot)
                }
                ',' => self.single(Token::Comma),
                '*' => self.single(Token::Star),
                '?' | '$' => {
                    self.pos += 1;
                    let name = self.take_while(is_name_char);
                    if name.is_empty() {
                        return Err(GraphError::malformed_query(start, "empty variable name"));
                    }
                    Token::Variable(name)
                }
                '"' | '\'' => self.string(c, start)?,
                '<' if self.looks_like_iri() => self.iri(start)?,
                '<' | '>' | '=' | '!' => self.operator(c, start)?,
                '&' | '|' => {
                    self.pos += 1;
                    if self.bump() != Some(c) {
                        return Err(GraphError::malformed_query(start, format!("expected '{c}{c}'")));
                    }
                    if c == '&' {
                        Token::AndAnd
                    } else {
                        Token::OrOr
                    }
                }
                c if c.is_ascii_digit() || c == '.' || c == '-' || c == '+' => self.number(start)?,
                c if c.is_alphabetic() || c == '_' || c == ':' => self.word(),
                other => {
                    return Err(GraphError::malformed_query(
                        start,
                        format!("unexpected character '{other}'"),
                    ))
                }
            };
            tokens.push((start, token));
        }
        Ok(tokens)
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    // `<` starts an IRI when a `>` closes it before any whitespace
    fn looks_like_iri(&self) -> bool {
        self.chars[self.pos + 1..]
            .iter()
            .map(|(_, c)| *c)
            .find(|c| *c == '>' || c.is_whitespace())
            == Some('>')
    }

    fn iri(&mut self, start: usize) -> Result<Token> {
        self.pos += 1;
        let iri = self.take_while(|c| c != '>');
        if self.bump() != Some('>') {
            return Err(GraphError::malformed_query(start, "unterminated IRI"));
        }
        Ok(Token::IriRef(iri))
    }

    fn operator(&mut self, c: char, start: usize) -> Result<Token> {
        self.pos += 1;
        let eq_next = self.peek() == Some('=');
        let op = match (c, eq_next) {
            ('<', true) => Token::Compare(CompareOp::Le),
            ('>', true) => Token::Compare(CompareOp::Ge),
            ('!', true) => Token::Compare(CompareOp::Ne),
            ('=', true) => {
                return Err(GraphError::malformed_query(start, "use '=' for equality"));
            }
            ('<', false) => return Ok(Token::Compare(CompareOp::Lt)),
            ('>', false) => return Ok(Token::Compare(CompareOp::Gt)),
            ('=', false) => return Ok(Token::Compare(CompareOp::Eq)),
            _ => return Ok(Token::Bang),
        };
        self.pos += 1;
        Ok(op)
    }

    fn string(&mut self, quote: char, start: usize) -> Result<Token> {
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(GraphError::malformed_query(start, "unterminated string")),
                Some(c) if c == quote => break,
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some(other @ ('"' | '\'' | '\\')) => value.push(other),
                    _ => return Err(GraphError::malformed_query(start, "invalid escape in string")),
                },
                Some(c) => value.push(c),
            }
        }
        Ok(Token::Str(value))
    }

    fn number(&mut self, start: usize) -> Result<Token> {
        let mut raw = String::new();
        if matches!(self.peek(), Some('-' | '+')) {
            raw.push(self.bump().unwrap_or('+'));
        }
        raw.push_str(&self.take_while(|c| c.is_ascii_digit()));
        // A trailing '.' not followed by a digit is the triple terminator
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
            raw.push('.');
            raw.push_str(&self.take_while(|c| c.is_ascii_digit()));
            return raw
                .parse()
                .map(Token::Decimal)
                .map_err(|_| GraphError::malformed_query(start, format!("invalid number '{raw}'")));
        }
        raw.parse()
            .map(Token::Integer)
            .map_err(|_| GraphError::malformed_query(start, format!("invalid number '{raw}'")))
    }

    fn word(&mut self) -> Token {
        let prefix = self.take_while(is_name_char);
        if self.peek() != Some(':') {
            return Token::Word(prefix);
        }
        self.pos += 1;
        let mut local = self.take_while(|c| is_name_char(c) || c == '.');
        // Give back trailing dots: they terminate the triple
        while local.ends_with('.') {
            local.pop();
            self.pos -= 1;
        }
        Token::PrefixedName(prefix, local)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

// ===== PARSER =====

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
    prefixes: HashMap<String, String>,
}

impl Parser {
    fn new(tokens: Vec<(usize, Token)>, end: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end,
            prefixes: HashMap::new(),
        }
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(o, _)| *o)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T> {
        Err(GraphError::malformed_query(self.offset(), message))
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<()> {
        if self.peek() == Some(&expected) {
            self.pos += 1;
            Ok(())
        } else {
            self.error(format!("expected {what}"))
        }
    }

    fn parse_query(mut self) -> Result<PatternQuery> {
        while self.eat_keyword("PREFIX") {
            self.parse_prefix()?;
        }

        if !self.eat_keyword("SELECT") {
            return self.error("expected SELECT");
        }
        let distinct = self.eat_keyword("DISTINCT");
        let projection = self.parse_projection()?;

        self.eat_keyword("WHERE");
        self.expect(Token::LBrace, "'{'")?;
        let (patterns, filters) = self.parse_group()?;
        self.expect(Token::RBrace, "'}'")?;

        let limit = if self.eat_keyword("LIMIT") {
            match self.next() {
                Some(Token::Integer(n)) if n >= 0 => Some(n as usize),
                _ => {
                    self.pos -= 1;
                    return self.error("LIMIT expects a non-negative integer");
                }
            }
        } else {
            None
        };

        if self.peek().is_some() {
            return self.error("unexpected trailing input");
        }
        if patterns.is_empty() {
            return self.error("WHERE block has no triple patterns");
        }

        Ok(PatternQuery {
            distinct,
            projection,
            patterns,
            filters,
            limit,
        })
    }

    fn parse_prefix(&mut self) -> Result<()> {
        let name = match self.next() {
            Some(Token::PrefixedName(prefix, local)) if local.is_empty() => prefix,
            _ => {
                self.pos -= 1;
                return self.error("expected prefix name like 'ex:'");
            }
        };
        match self.next() {
            Some(Token::IriRef(iri)) => {
                self.prefixes.insert(name, iri);
                Ok(())
            }
            _ => {
                self.pos -= 1;
                self.error("expected <iri> after prefix name")
            }
        }
    }

    fn parse_projection(&mut self) -> Result<Projection> {
        if self.peek() == Some(&Token::Star) {
            self.pos += 1;
            return Ok(Projection::All);
        }
        let mut vars = Vec::new();
        while let Some(Token::Variable(name)) = self.peek() {
            vars.push(name.clone());
            self.pos += 1;
        }
        if vars.is_empty() {
            return self.error("expected '*' or variables after SELECT");
        }
        Ok(Projection::Variables(vars))
    }

    fn parse_group(&mut self) -> Result<(Vec<TriplePattern>, Vec<FilterExpr>)> {
        let mut patterns = Vec::new();
        let mut filters = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RBrace) | None => break,
                Some(Token::Dot) => {
                    self.pos += 1;
                }
                _ if self.peek_keyword("FILTER") => {
                    self.pos += 1;
                    filters.push(self.parse_filter()?);
                }
                _ => {
                    let subject = self.parse_term()?;
                    let predicate = self.parse_predicate()?;
                    let object = self.parse_term()?;
                    patterns.push(TriplePattern {
                        subject,
                        predicate,
                        object,
                    });
                    match self.peek() {
                        Some(Token::Dot) | Some(Token::RBrace) => {}
                        _ if self.peek_keyword("FILTER") => {}
                        _ => return self.error("expected '.' after triple pattern"),
                    }
                }
            }
        }
        Ok((patterns, filters))
    }

    fn parse_predicate(&mut self) -> Result<PatternTerm> {
        if self.peek() == Some(&Token::Word("a".to_string())) {
            self.pos += 1;
            return Ok(PatternTerm::Resource(Relation::Type.iri()));
        }
        self.parse_term()
    }

    fn parse_term(&mut self) -> Result<PatternTerm> {
        let start = self.offset();
        match self.next() {
            Some(Token::Variable(name)) => Ok(PatternTerm::Variable(name)),
            Some(Token::PrefixedName(prefix, local)) => {
                Ok(PatternTerm::Resource(self.resolve_prefixed(&prefix, &local, start)?))
            }
            Some(Token::IriRef(iri)) => Ok(PatternTerm::Resource(self.resolve_full(&iri))),
            Some(Token::Str(s)) => Ok(PatternTerm::Literal(Literal::String(s))),
            Some(Token::Integer(i)) => Ok(PatternTerm::Literal(Literal::Integer(i))),
            Some(Token::Decimal(d)) => Ok(PatternTerm::Literal(Literal::Double(Double(d)))),
            _ => {
                self.pos -= 1;
                self.error("expected variable, IRI or literal")
            }
        }
    }

    /// Declared prefixes pointing at a well-known namespace keep that
    /// namespace's prefix; any other declared prefix names the document
    /// namespace.
    fn resolve_prefixed(&self, prefix: &str, local: &str, at: usize) -> Result<Iri> {
        let compact_prefix = match self.prefixes.get(prefix) {
            Some(ns) => match ns.as_str() {
                RDF_NS => "rdf",
                RDFS_NS => "rdfs",
                OWL_NS => "owl",
                XSD_NS => "xsd",
                _ => "ex",
            },
            None => match prefix {
                "rdf" | "rdfs" | "owl" | "xsd" | "ex" => prefix,
                _ => {
                    return Err(GraphError::malformed_query(
                        at,
                        format!("undeclared prefix '{prefix}:'"),
                    ))
                }
            },
        };
        Ok(Iri::new(compact_prefix, local))
    }

    fn resolve_full(&self, iri: &str) -> Iri {
        Iri::compact_from(iri, DEFAULT_NAMESPACE)
            .or_else(|| {
                // Declared namespaces stand for the document namespace
                self.prefixes
                    .values()
                    .find_map(|ns| iri.strip_prefix(ns.as_str()))
                    .map(Iri::ex)
            })
            .unwrap_or_else(|| Iri::from_compact(iri))
    }

    fn parse_filter(&mut self) -> Result<FilterExpr> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let expr = self.parse_or()?;
            self.expect(Token::RParen, "')' closing FILTER")?;
            return Ok(expr);
        }
        // FILTER REGEX(...) without surrounding parentheses
        self.parse_primary()
    }

    fn parse_or(&mut self) -> Result<FilterExpr> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::OrOr) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = FilterExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<FilterExpr> {
        let mut left = self.parse_unary()?;
        while self.peek() == Some(&Token::AndAnd) {
            self.pos += 1;
            let right = self.parse_unary()?;
            left = FilterExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<FilterExpr> {
        if self.peek() == Some(&Token::Bang) {
            self.pos += 1;
            return Ok(FilterExpr::Not(Box::new(self.parse_unary()?)));
        }
        let left = self.parse_primary()?;
        if let Some(Token::Compare(op)) = self.peek() {
            let op = *op;
            self.pos += 1;
            let right = self.parse_primary()?;
            return Ok(FilterExpr::Compare(op, Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<FilterExpr> {
        let start = self.offset();
        match self.next() {
            Some(Token::LParen) => {
                let expr = self.parse_or()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            Some(Token::Variable(name)) => Ok(FilterExpr::Variable(name)),
            Some(Token::Str(s)) => Ok(FilterExpr::Constant(Term::Literal(Literal::String(s)))),
            Some(Token::Integer(i)) => Ok(FilterExpr::Constant(Term::Literal(Literal::Integer(i)))),
            Some(Token::Decimal(d)) => {
                Ok(FilterExpr::Constant(Term::Literal(Literal::Double(Double(d)))))
            }
            Some(Token::IriRef(iri)) => Ok(FilterExpr::Constant(Term::Resource(self.resolve_full(&iri)))),
            Some(Token::PrefixedName(prefix, local)) => Ok(FilterExpr::Constant(Term::Resource(
                self.resolve_prefixed(&prefix, &local, start)?,
            ))),
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("true") => Ok(FilterExpr::Boolean(true)),
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("false") => Ok(FilterExpr::Boolean(false)),
            Some(Token::Word(word)) => match Function::from_keyword(&word) {
                Some(function) => self.parse_call(function, start),
                None => Err(GraphError::malformed_query(start, format!("unknown function '{word}'"))),
            },
            _ => Err(GraphError::malformed_query(start, "expected filter expression")),
        }
    }

    fn parse_call(&mut self, function: Function, start: usize) -> Result<FilterExpr> {
        self.expect(Token::LParen, "'(' after function name")?;
        let mut args = vec![self.parse_or()?];
        while self.peek() == Some(&Token::Comma) {
            self.pos += 1;
            args.push(self.parse_or()?);
        }
        self.expect(Token::RParen, "')' closing function call")?;

        let (min, max) = function.arity();
        if args.len() < min || args.len() > max {
            return Err(GraphError::malformed_query(
                start,
                format!("{function:?} takes {min}..={max} arguments, got {}", args.len()),
            ));
        }
        Ok(FilterExpr::Call(function, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_canonical_price_query() {
        let query = PatternQuery::parse(
            r#"
            PREFIX ex: <https://shop.example/item>
            SELECT ?element ?text
            WHERE {
              ?element a ?type .
              ?element ex:hasText ?text .
              FILTER(CONTAINS(LCASE(?text), "price"))
            }
            "#,
        )
        .unwrap();
        assert!(!query.distinct);
        assert_eq!(
            query.projection,
            Projection::Variables(vec!["element".into(), "text".into()])
        );
        assert_eq!(query.patterns.len(), 2);
        assert_eq!(
            query.patterns[0].predicate,
            PatternTerm::Resource(Iri::new("rdf", "type"))
        );
        assert_eq!(
            query.patterns[1].predicate,
            PatternTerm::Resource(Iri::ex("hasText"))
        );
        assert!(matches!(
            &query.filters[0],
            FilterExpr::Call(Function::Contains, args) if args.len() == 2
        ));
    }

    #[test]
    fn parses_distinct_star_limit_and_operators() {
        let query = PatternQuery::parse(
            "SELECT DISTINCT * WHERE { ?s ex:textPosition ?p . FILTER(?p >= 1 && !(?p = 3) || ?p < 0.5) } LIMIT 10",
        )
        .unwrap();
        assert!(query.distinct);
        assert_eq!(query.projection, Projection::All);
        assert_eq!(query.limit, Some(10));
        assert!(matches!(query.filters[0], FilterExpr::Or(_, _)));
    }

    #[test]
    fn trailing_dot_after_prefixed_name_terminates_triple() {
        let query = PatternQuery::parse("SELECT ?s WHERE { ?s a ex:TextElement.}").unwrap();
        assert_eq!(query.patterns[0].object, PatternTerm::Resource(Iri::ex("TextElement")));
    }

    #[test]
    fn malformed_queries_report_position() {
        let cases = [
            "SELECT WHERE { ?s ?p ?o }",
            "SELECT ?s WHERE { ?s ?p }",
            "SELECT ?s WHERE { ?s foo:bar ?o }",
            "SELECT ?s WHERE { ?s ?p ?o . FILTER(NOPE(?o)) }",
            "SELECT ?s WHERE { ?s ?p \"open }",
            "SELECT ?s WHERE { ?s ?p ?o } LIMIT x",
        ];
        for text in cases {
            let err = PatternQuery::parse(text).unwrap_err();
            assert!(
                matches!(err, GraphError::MalformedQuery { .. }),
                "expected malformed query for {text}"
            );
        }
        match PatternQuery::parse("SELECT ?s WHERE { ?s foo:bar ?o }").unwrap_err() {
            GraphError::MalformedQuery { position, .. } => assert_eq!(position, 21),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn full_iris_compact_to_known_namespaces() {
        let query = PatternQuery::parse(
            "SELECT ?e WHERE { ?e <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.org/LinkElement> . \
             ?e <http://other.example/x> ?o }",
        )
        .unwrap();
        assert_eq!(query.patterns[0].predicate, PatternTerm::Resource(Relation::Type.iri()));
        assert_eq!(query.patterns[0].object, PatternTerm::Resource(Iri::ex("LinkElement")));
        assert_eq!(
            query.patterns[1].predicate,
            PatternTerm::Resource(Iri::from_compact("http://other.example/x"))
        );
    }
}

