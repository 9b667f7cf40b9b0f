//! Serialization of fused stores
//!
//! Output is sorted by term so that two runs over the same input produce
//! byte-identical files.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::config::OutputFormat;
use crate::core::ns;
use crate::store::Store;
use crate::term::{escape, Datatype, Literal, Term, Triple};

/// Serialize `store` in `format`
pub fn serialize(store: &Store, format: OutputFormat, prefixes: &IndexMap<String, String>) -> String {
    match format {
        OutputFormat::Turtle => to_turtle(store, prefixes),
        OutputFormat::NTriples => to_ntriples(store),
    }
}

/// N-Triples, always with full IRIs
pub fn to_ntriples(store: &Store) -> String {
    let mut output = String::new();
    for triple in store.sorted() {
        output.push_str(&format!("{} {} {} .\n", triple.subject, triple.predicate, triple.object));
    }
    output
}

/// Turtle formatter with prefix support
struct TurtleFormatter {
    /// Namespace IRI -> prefix, user prefixes before well-known ones
    prefixes: IndexMap<String, String>,
}

impl TurtleFormatter {
    fn new(user: &IndexMap<String, String>) -> Self {
        let mut prefixes = IndexMap::new();
        for (short, long) in user {
            prefixes.entry(long.clone()).or_insert_with(|| short.clone());
        }
        for (short, long) in ns::well_known() {
            prefixes.entry(long.to_string()).or_insert_with(|| short.to_string());
        }
        TurtleFormatter { prefixes }
    }

    /// The namespace a URI can be compacted with, if any
    fn namespace_of(&self, uri: &str) -> Option<(&str, &str)> {
        self.prefixes
            .iter()
            .filter(|(long, _)| uri.starts_with(long.as_str()))
            .filter(|(long, _)| is_valid_local_name(&uri[long.len()..]))
            .max_by_key(|(long, _)| long.len())
            .map(|(long, short)| (long.as_str(), short.as_str()))
    }

    fn compact_uri(&self, uri: &str) -> String {
        match self.namespace_of(uri) {
            Some((long, short)) => format!("{}:{}", short, &uri[long.len()..]),
            None => format!("<{}>", uri),
        }
    }

    fn format_predicate(&self, predicate: &Term) -> String {
        match predicate.as_uri() {
            Some(u) if u.as_str() == ns::uri(ns::RDF, "type") => "a".to_string(),
            _ => self.format_term(predicate),
        }
    }

    fn format_term(&self, term: &Term) -> String {
        match term {
            Term::Uri(u) => self.compact_uri(u.as_str()),
            Term::Literal(l) => self.format_literal(l),
            Term::BlankNode(b) => format!("{}", b),
        }
    }

    fn format_literal(&self, lit: &Literal) -> String {
        match lit.datatype() {
            Datatype::Plain => format!("\"{}\"", escape(lit.value())),
            Datatype::Language(lang) => format!("\"{}\"@{}", escape(lit.value()), lang),
            Datatype::Typed(dt) => format!("\"{}\"^^{}", escape(lit.value()), self.compact_uri(dt)),
        }
    }

    /// Namespaces actually used by `triples`, in declaration order
    fn used_prefixes(&self, triples: &[Triple]) -> Vec<(&str, &str)> {
        let mut used: HashSet<&str> = HashSet::new();
        for triple in triples {
            let predicate = match self.format_predicate(&triple.predicate).as_str() {
                "a" => None,
                _ => Some(&triple.predicate),
            };
            for term in [Some(&triple.subject), predicate, Some(&triple.object)].into_iter().flatten() {
                let uri = match term {
                    Term::Uri(u) => Some(u.as_str()),
                    Term::Literal(l) => l.datatype_uri(),
                    Term::BlankNode(_) => None,
                };
                if let Some((long, _)) = uri.and_then(|u| self.namespace_of(u)) {
                    used.insert(long);
                }
            }
        }
        self.prefixes
            .iter()
            .filter(|(long, _)| used.contains(long.as_str()))
            .map(|(long, short)| (short.as_str(), long.as_str()))
            .collect()
    }
}

/// Check if a string is a valid local name for prefixed URIs
fn is_valid_local_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    !s.ends_with('.') && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
}

/// Turtle with prefix declarations, grouped by subject
pub fn to_turtle(store: &Store, prefixes: &IndexMap<String, String>) -> String {
    let formatter = TurtleFormatter::new(prefixes);
    let triples = store.sorted();
    let mut output = String::new();

    let used = formatter.used_prefixes(&triples);
    for (short, long) in &used {
        output.push_str(&format!("@prefix {}: <{}> .\n", short, long));
    }
    if !used.is_empty() {
        output.push('\n');
    }

    let mut by_subject: IndexMap<&Term, Vec<&Triple>> = IndexMap::new();
    for triple in &triples {
        by_subject.entry(&triple.subject).or_default().push(triple);
    }

    for (subject, group) in by_subject {
        let subject = formatter.format_term(subject);
        if let [only] = group.as_slice() {
            output.push_str(&format!(
                "{} {} {} .\n",
                subject,
                formatter.format_predicate(&only.predicate),
                formatter.format_term(&only.object)
            ));
            continue;
        }
        output.push_str(&format!("{}\n", subject));
        for (i, t) in group.iter().enumerate() {
            let sep = if i + 1 < group.len() { " ;" } else { " ." };
            output.push_str(&format!(
                "    {} {}{}\n",
                formatter.format_predicate(&t.predicate),
                formatter.format_term(&t.object),
                sep
            ));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn sample() -> Store {
        parse(r#"
            @prefix : <http://example.org/ns#> .
            :alice a :Person ; :name "Alice \"A\"" ; :age 30 .
            :bob :label "Bob"@en .
        "#).unwrap().into_store()
    }

    #[test]
    fn test_ntriples_is_sorted_and_full() {
        let out = to_ntriples(&sample());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("<http://example.org/ns#alice>"));
        assert!(out.contains(r#""Alice \"A\"""#));
        assert!(out.contains("\"Bob\"@en"));
        assert!(out.contains("\"30\"^^<http://www.w3.org/2001/XMLSchema#integer>"));
    }

    #[test]
    fn test_turtle_groups_and_compacts() {
        let mut prefixes = IndexMap::new();
        prefixes.insert("ex".to_string(), "http://example.org/ns#".to_string());
        let out = to_turtle(&sample(), &prefixes);

        assert!(out.starts_with("@prefix ex: <http://example.org/ns#> .\n@prefix xsd:"));
        assert!(!out.contains("@prefix rdf:"));
        assert!(out.contains("ex:alice\n"));
        assert!(out.contains("    a ex:Person .\n"));
        assert!(out.contains("\"30\"^^xsd:integer"));
        assert!(out.contains("ex:bob ex:label \"Bob\"@en .\n"));
    }

    #[test]
    fn test_turtle_round_trips_through_parser() {
        let store = sample();
        let reparsed = parse(&to_turtle(&store, &IndexMap::new())).unwrap().into_store();
        assert_eq!(reparsed.sorted(), store.sorted());
    }

    #[test]
    fn test_local_names() {
        assert!(is_valid_local_name("Person"));
        assert!(is_valid_local_name("has-part_2"));
        assert!(!is_valid_local_name(""));
        assert!(!is_valid_local_name("1st"));
        assert!(!is_valid_local_name("trailing."));
        assert!(!is_valid_local_name("a/b"));
    }
}
