//! Turtle parser
//!
//! A nom-based reader for the Turtle subset used by data graphs and SHACL
//! shapes graphs:
//! - `@prefix` / `PREFIX`, `@base` / `BASE`
//! - IRIs, prefixed names and the `a` shorthand
//! - labeled blank nodes (scoped to one document), `[ ... ]` property lists
//! - collections `( ... )`, expanded to `rdf:first` / `rdf:rest` chains
//! - short and long strings, language tags, datatypes, numbers and booleans
//! - `#` comments

use std::sync::Arc;

use fnv::FnvHashMap;
use nom::{
    IResult,
    bytes::complete::{tag, take_while, take_while1, take_until},
    character::complete::{anychar, char, digit1, multispace1, one_of},
    combinator::{opt, map, value, recognize},
    sequence::{delimited, preceded, pair, tuple},
    branch::alt,
    multi::many0,
};

use indexmap::IndexMap;

use crate::core::{ns, vocab};
use crate::store::Store;
use crate::term::{Term, Triple, Uri, Literal};

/// Parser error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("Undefined prefix: {prefix}")]
    UndefinedPrefix { prefix: String },

    #[error("Unexpected end of input")]
    UnexpectedEof,
}

/// Parser state holding prefix mappings
#[derive(Debug, Clone, Default)]
pub struct ParserState {
    /// Prefix to namespace mappings
    prefixes: IndexMap<String, String>,
    /// Base URI for relative resolution
    base: Option<Uri>,
}

impl ParserState {
    pub fn new() -> Self {
        let mut state = Self::default();
        for (prefix, namespace) in ns::well_known() {
            state.add_prefix(prefix, namespace);
        }
        state
    }

    pub fn with_base(base: Uri) -> Self {
        let mut state = Self::new();
        state.base = Some(base);
        state
    }

    pub fn add_prefix(&mut self, prefix: &str, namespace: &str) {
        let namespace = self.resolve_relative(namespace);
        self.prefixes.insert(prefix.to_string(), namespace.as_str().to_string());
    }

    pub fn resolve_prefix(&self, prefix: &str, local: &str) -> Result<Uri, ParseError> {
        if let Some(ns) = self.prefixes.get(prefix) {
            Ok(Uri::new(format!("{}{}", ns, unescape_local(local))))
        } else {
            Err(ParseError::UndefinedPrefix { prefix: prefix.to_string() })
        }
    }

    pub fn resolve_relative(&self, relative: &str) -> Uri {
        match &self.base {
            Some(base) => base.resolve(relative),
            None => Uri::new(relative.to_string()),
        }
    }

    pub fn prefixes(&self) -> &IndexMap<String, String> {
        &self.prefixes
    }
}

/// Parse whitespace and comments
fn ws(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), preceded(char('#'), take_while(|c| c != '\n'))),
        )))
    )(input)
}

fn skip_ws(input: &str) -> &str {
    ws(input).map(|(rest, _)| rest).unwrap_or(input)
}

/// Parse an IRI reference <...>
fn iri_ref(input: &str) -> IResult<&str, &str> {
    delimited(
        char('<'),
        take_while(|c| c != '>' && c != ' ' && c != '\n' && c != '\r'),
        char('>'),
    )(input)
}

/// Parse a prefixed name (prefix:local)
///
/// A local name may contain dots but never ends with one, so `ex:a.` is the
/// name `ex:a` followed by the statement terminator.
fn prefixed_name(input: &str) -> IResult<&str, (&str, &str)> {
    let pn_chars = |c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == '.' || c == '\\' || c == '%';

    let (input, prefix) = take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '-')(input)?;
    let (after_colon, _) = char(':')(input)?;
    let (_, local) = take_while(pn_chars)(after_colon)?;
    let local = local.trim_end_matches('.');
    Ok((&after_colon[local.len()..], (prefix, local)))
}

/// Strip the reserved-character escapes allowed in local names (`ex:a\-b`)
fn unescape_local(local: &str) -> String {
    let mut out = String::with_capacity(local.len());
    let mut chars = local.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}

/// Parse a string literal with possible escape sequences
fn string_literal(input: &str) -> IResult<&str, String> {
    alt((
        // Long string """..."""
        map(
            delimited(tag("\"\"\""), take_until("\"\"\""), tag("\"\"\"")),
            unescape_string,
        ),
        // Long string '''...'''
        map(
            delimited(tag("'''"), take_until("'''"), tag("'''")),
            unescape_string,
        ),
        // Short string "..."
        map(
            delimited(
                char('"'),
                recognize(many0(alt((
                    take_while1(|c| c != '"' && c != '\\' && c != '\n'),
                    recognize(pair(char('\\'), anychar)),
                )))),
                char('"'),
            ),
            unescape_string,
        ),
        // Single-quoted string '...'
        map(
            delimited(
                char('\''),
                recognize(many0(alt((
                    take_while1(|c| c != '\'' && c != '\\' && c != '\n'),
                    recognize(pair(char('\\'), anychar)),
                )))),
                char('\''),
            ),
            unescape_string,
        ),
    ))(input)
}

/// Unescape string escape sequences, including `\uXXXX` and `\UXXXXXXXX`
fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('b') => result.push('\u{8}'),
            Some('f') => result.push('\u{c}'),
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some('\'') => result.push('\''),
            Some(u @ ('u' | 'U')) => {
                let width = if u == 'u' { 4 } else { 8 };
                let hex: String = (0..width).filter_map(|_| chars.next()).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => result.push(decoded),
                    None => {
                        result.push('\\');
                        result.push(u);
                        result.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}

/// Parse a blank node label `_:label`, returning the label
fn blank_node_label(input: &str) -> IResult<&str, &str> {
    let (input, _) = tag("_:")(input)?;
    let (_, label) = take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')(input)?;
    let label = label.trim_end_matches('.');
    Ok((&input[label.len()..], label))
}

/// Parse a numeric literal
fn numeric_literal(input: &str) -> IResult<&str, Literal> {
    let (input, sign) = opt(one_of("+-"))(input)?;
    let (input, digits) = digit1(input)?;
    let (input, decimal) = opt(pair(char('.'), digit1))(input)?;
    let (input, exp) = opt(tuple((one_of("eE"), opt(one_of("+-")), digit1)))(input)?;

    let mut value = String::new();
    if let Some(sign) = sign {
        value.push(sign);
    }
    value.push_str(digits);
    if let Some((_, frac)) = decimal {
        value.push('.');
        value.push_str(frac);
    }

    let datatype = if let Some((e, exp_sign, exp_digits)) = exp {
        value.push(e);
        if let Some(s) = exp_sign {
            value.push(s);
        }
        value.push_str(exp_digits);
        "double"
    } else if decimal.is_some() {
        "decimal"
    } else {
        "integer"
    };

    Ok((input, Literal::typed(value, ns::uri(ns::XSD, datatype))))
}

/// Parse a boolean literal
fn boolean_literal(input: &str) -> IResult<&str, Literal> {
    let boolean = |v: &str| Literal::typed(v.to_string(), ns::uri(ns::XSD, "boolean"));
    let (rest, lit) = alt((
        map(tag("true"), |_| boolean("true")),
        map(tag("false"), |_| boolean("false")),
    ))(input)?;
    if rest.starts_with(|c: char| c.is_alphanumeric() || c == ':' || c == '_') {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }
    Ok((rest, lit))
}

/// Parse 'a' as rdf:type
fn rdf_type_shorthand(input: &str) -> IResult<&str, ()> {
    let (rest, _) = char('a')(input)?;
    // Make sure 'a' is not part of a longer word or a prefixed name
    if rest.starts_with(|c: char| c.is_alphanumeric() || c == ':' || c == '_' || c == '-') {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char)));
    }
    Ok((rest, ()))
}

/// Result of parsing Turtle content
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub triples: Vec<Triple>,
    pub prefixes: IndexMap<String, String>,
    pub base: Option<String>,
}

impl ParseResult {
    /// Load the parsed triples into a fresh store
    pub fn into_store(self) -> Store {
        self.triples.into_iter().collect()
    }
}

/// Turtle document parser
pub struct TurtleParser {
    state: ParserState,
    triples: Vec<Triple>,
    /// Blank node labels seen in the current document
    blank_labels: FnvHashMap<String, Term>,
    /// Length of the document being parsed, for error positions
    source_len: usize,
}

impl TurtleParser {
    pub fn new() -> Self {
        TurtleParser {
            state: ParserState::new(),
            triples: Vec::new(),
            blank_labels: FnvHashMap::default(),
            source_len: 0,
        }
    }

    pub fn with_base(base: &str) -> Self {
        TurtleParser {
            state: ParserState::with_base(Uri::new(base.to_string())),
            ..Self::new()
        }
    }

    fn syntax(&self, at: &str, message: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            position: self.source_len.saturating_sub(at.len()),
            message: message.into(),
        }
    }

    fn expect<'a>(&self, input: &'a str, c: char, context: &str) -> Result<&'a str, ParseError> {
        if input.is_empty() {
            return Err(ParseError::UnexpectedEof);
        }
        char::<&str, nom::error::Error<&str>>(c)(input)
            .map(|(rest, _)| rest)
            .map_err(|_| self.syntax(input, format!("Expected '{}' {}", c, context)))
    }

    /// Parse a complete Turtle document
    pub fn parse_document(&mut self, input: &str) -> Result<(), ParseError> {
        self.source_len = input.len();
        self.blank_labels.clear();
        let mut remaining = input;

        loop {
            remaining = skip_ws(remaining);
            if remaining.is_empty() {
                break;
            }

            if remaining.starts_with('@') {
                remaining = self.parse_directive(remaining)?;
            } else if starts_with_keyword(remaining, "PREFIX") || starts_with_keyword(remaining, "BASE") {
                remaining = self.parse_sparql_directive(remaining)?;
            } else {
                remaining = self.parse_statement(remaining)?;
            }
        }

        Ok(())
    }

    /// Parse a @prefix or @base directive
    fn parse_directive<'a>(&mut self, input: &'a str) -> Result<&'a str, ParseError> {
        let rest = if let Some(rest) = input.strip_prefix("@prefix") {
            self.parse_prefix_decl(rest)?
        } else if let Some(rest) = input.strip_prefix("@base") {
            self.parse_base_decl(rest)?
        } else {
            return Err(self.syntax(input, "Unknown directive"));
        };
        let rest = skip_ws(rest);
        self.expect(rest, '.', "after directive")
    }

    /// Parse SPARQL-style PREFIX/BASE (no trailing '.')
    fn parse_sparql_directive<'a>(&mut self, input: &'a str) -> Result<&'a str, ParseError> {
        if starts_with_keyword(input, "PREFIX") {
            self.parse_prefix_decl(&input[6..])
        } else {
            self.parse_base_decl(&input[4..])
        }
    }

    fn parse_prefix_decl<'a>(&mut self, input: &'a str) -> Result<&'a str, ParseError> {
        let input = skip_ws(input);

        let (input, prefix) = take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '-')(input)
            .map_err(|_: nom::Err<nom::error::Error<&str>>| ParseError::UnexpectedEof)?;
        let input = self.expect(input, ':', "after prefix name")?;
        let input = skip_ws(input);

        let (input, namespace) = iri_ref(input)
            .map_err(|_| self.syntax(input, "Expected IRI for namespace"))?;

        self.state.add_prefix(prefix, namespace);
        Ok(input)
    }

    fn parse_base_decl<'a>(&mut self, input: &'a str) -> Result<&'a str, ParseError> {
        let input = skip_ws(input);

        let (input, base_uri) = iri_ref(input)
            .map_err(|_| self.syntax(input, "Expected IRI for base"))?;

        self.state.base = Some(self.state.resolve_relative(base_uri));
        Ok(input)
    }

    /// Parse a statement (subject with predicate-object list)
    fn parse_statement<'a>(&mut self, input: &'a str) -> Result<&'a str, ParseError> {
        let anonymous_subject = input.starts_with('[');
        let (input, subject) = self.parse_term(input)?;
        let input = skip_ws(input);

        // `[ ex:p ex:o ] .` is a complete statement on its own
        if anonymous_subject && input.starts_with('.') {
            return self.expect(input, '.', "at end of statement");
        }

        if !subject.is_resource() {
            return Err(self.syntax(input, "A literal cannot be a subject"));
        }

        let input = self.parse_predicate_object_list(input, &subject)?;
        let input = skip_ws(input);

        self.expect(input, '.', "at end of statement")
    }

    /// Parse predicate-object list (handles ; separator, repeated or trailing)
    fn parse_predicate_object_list<'a>(&mut self, input: &'a str, subject: &Term) -> Result<&'a str, ParseError> {
        let mut remaining = input;

        loop {
            let (input, predicate) = self.parse_predicate(remaining)?;
            let input = skip_ws(input);

            let input = self.parse_object_list(input, subject, &predicate)?;
            let input = skip_ws(input);

            if !input.starts_with(';') {
                return Ok(input);
            }

            remaining = input;
            while let Some(rest) = remaining.strip_prefix(';') {
                remaining = skip_ws(rest);
            }
            if remaining.is_empty() || remaining.starts_with('.') || remaining.starts_with(']') {
                return Ok(remaining);
            }
        }
    }

    /// Parse object list (handles , separator)
    fn parse_object_list<'a>(&mut self, input: &'a str, subject: &Term, predicate: &Term) -> Result<&'a str, ParseError> {
        let mut remaining = input;

        loop {
            let (input, object) = self.parse_term(remaining)?;
            self.triples.push(Triple::new(subject.clone(), predicate.clone(), object));

            let input = skip_ws(input);
            match input.strip_prefix(',') {
                Some(rest) => remaining = skip_ws(rest),
                None => return Ok(input),
            }
        }
    }

    /// Parse a predicate (including the 'a' shorthand)
    fn parse_predicate<'a>(&mut self, input: &'a str) -> Result<(&'a str, Term), ParseError> {
        if let Ok((rest, _)) = rdf_type_shorthand(input) {
            return Ok((rest, vocab().rdf_type.clone()));
        }

        if let Ok((rest, uri)) = iri_ref(input) {
            return Ok((rest, Term::Uri(Arc::new(self.state.resolve_relative(uri)))));
        }

        if let Ok((rest, (prefix, local))) = prefixed_name(input) {
            let uri = self.state.resolve_prefix(prefix, local)?;
            return Ok((rest, Term::Uri(Arc::new(uri))));
        }

        if input.is_empty() {
            return Err(ParseError::UnexpectedEof);
        }
        Err(self.syntax(input, "Expected predicate IRI"))
    }

    /// Parse a term (subject or object)
    fn parse_term<'a>(&mut self, input: &'a str) -> Result<(&'a str, Term), ParseError> {
        if input.is_empty() {
            return Err(ParseError::UnexpectedEof);
        }

        // Try IRI
        if let Ok((rest, uri)) = iri_ref(input) {
            let resolved = self.state.resolve_relative(uri);
            return Ok((rest, Term::Uri(Arc::new(resolved))));
        }

        // Try labeled blank node
        if let Ok((rest, label)) = blank_node_label(input) {
            let node = self.blank_labels
                .entry(label.to_string())
                .or_insert_with(|| Term::blank(label))
                .clone();
            return Ok((rest, node));
        }

        // Try anonymous blank node []
        if input.starts_with('[') {
            return self.parse_blank_node_property_list(input);
        }

        // Try collection ()
        if input.starts_with('(') {
            return self.parse_collection(input);
        }

        // Try literal
        if input.starts_with('"') || input.starts_with('\'') {
            return self.parse_literal(input);
        }

        // Try numeric literal
        if input.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+') {
            if let Ok((rest, lit)) = numeric_literal(input) {
                return Ok((rest, Term::Literal(Arc::new(lit))));
            }
        }

        // Try boolean
        if let Ok((rest, lit)) = boolean_literal(input) {
            return Ok((rest, Term::Literal(Arc::new(lit))));
        }

        // Try prefixed name
        if let Ok((rest, (prefix, local))) = prefixed_name(input) {
            let uri = self.state.resolve_prefix(prefix, local)?;
            return Ok((rest, Term::Uri(Arc::new(uri))));
        }

        Err(self.syntax(
            input,
            format!("Cannot parse term starting with: {}", input.chars().take(20).collect::<String>()),
        ))
    }

    /// Parse a literal with optional datatype or language tag
    fn parse_literal<'a>(&mut self, input: &'a str) -> Result<(&'a str, Term), ParseError> {
        let (input, value) = string_literal(input)
            .map_err(|_| self.syntax(input, "Invalid string literal"))?;

        // Check for language tag
        if let Some(rest) = input.strip_prefix('@') {
            let (rest, lang) = take_while1(|c: char| c.is_alphanumeric() || c == '-')(rest)
                .map_err(|_: nom::Err<nom::error::Error<&str>>| self.syntax(rest, "Invalid language tag"))?;
            return Ok((rest, Term::lang_literal(value, lang)));
        }

        // Check for datatype
        if let Some(input) = input.strip_prefix("^^") {
            if let Ok((rest, dt_uri)) = iri_ref(input) {
                let dt = self.state.resolve_relative(dt_uri);
                return Ok((rest, Term::typed_literal(value, dt.as_str())));
            }

            if let Ok((rest, (prefix, local))) = prefixed_name(input) {
                let uri = self.state.resolve_prefix(prefix, local)?;
                return Ok((rest, Term::typed_literal(value, uri.as_str())));
            }

            return Err(self.syntax(input, "Expected datatype IRI after '^^'"));
        }

        Ok((input, Term::literal(value)))
    }

    /// Parse blank node property list [...]
    fn parse_blank_node_property_list<'a>(&mut self, input: &'a str) -> Result<(&'a str, Term), ParseError> {
        let input = self.expect(input, '[', "to open blank node")?;
        let input = skip_ws(input);

        let blank = Term::fresh_blank();

        if let Some(rest) = input.strip_prefix(']') {
            return Ok((rest, blank));
        }

        let input = self.parse_predicate_object_list(input, &blank)?;
        let input = skip_ws(input);
        let input = self.expect(input, ']', "to close blank node")?;

        Ok((input, blank))
    }

    /// Parse collection (...) into an rdf:first / rdf:rest chain
    fn parse_collection<'a>(&mut self, input: &'a str) -> Result<(&'a str, Term), ParseError> {
        let input = self.expect(input, '(', "to open collection")?;

        let mut items = Vec::new();
        let mut remaining = skip_ws(input);

        loop {
            if let Some(rest) = remaining.strip_prefix(')') {
                remaining = rest;
                break;
            }

            let (rest, term) = self.parse_term(remaining)?;
            items.push(term);
            remaining = skip_ws(rest);
        }

        let v = vocab();
        let mut head = v.rdf_nil.clone();
        for item in items.into_iter().rev() {
            let cell = Term::fresh_blank();
            self.triples.push(Triple::new(cell.clone(), v.rdf_first.clone(), item));
            self.triples.push(Triple::new(cell.clone(), v.rdf_rest.clone(), head));
            head = cell;
        }

        Ok((remaining, head))
    }

    /// Get the parsed triples
    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    /// Consume the parser and return results
    pub fn finish(self) -> ParseResult {
        ParseResult {
            triples: self.triples,
            prefixes: self.state.prefixes,
            base: self.state.base.map(|u| u.as_str().to_string()),
        }
    }
}

impl Default for TurtleParser {
    fn default() -> Self {
        Self::new()
    }
}

fn starts_with_keyword(input: &str, keyword: &str) -> bool {
    input.len() > keyword.len()
        && input[..keyword.len()].eq_ignore_ascii_case(keyword)
        && input[keyword.len()..].starts_with(char::is_whitespace)
}

/// Parse Turtle content
pub fn parse(input: &str) -> Result<ParseResult, ParseError> {
    let mut parser = TurtleParser::new();
    parser.parse_document(input)?;
    Ok(parser.finish())
}

/// Parse Turtle content, resolving relative IRIs against `base`
pub fn parse_with_base(input: &str, base: &str) -> Result<ParseResult, ParseError> {
    let mut parser = TurtleParser::with_base(base);
    parser.parse_document(input)?;
    Ok(parser.finish())
}
