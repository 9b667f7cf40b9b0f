//! RDF term representations
//!
//! This module defines the data types the fusion engine works on:
//! - URIs (named nodes)
//! - Literals (with optional datatype or language tag)
//! - Blank nodes (anonymous nodes)
//!
//! Terms are totally ordered so that every set the engine walks can be
//! visited in a reproducible order.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

pub mod uri;
mod literal;
mod blank;

pub use uri::Uri;
pub use literal::{Literal, Datatype};
pub(crate) use literal::escape;
pub use blank::BlankNode;

/// A term in an RDF graph
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    /// A URI reference (named node)
    Uri(Arc<Uri>),
    /// A blank node (anonymous)
    BlankNode(BlankNode),
    /// A literal value
    Literal(Arc<Literal>),
}

impl Term {
    /// Create a URI term
    pub fn uri(s: impl Into<String>) -> Self {
        Term::Uri(Arc::new(Uri::new(s.into())))
    }

    /// Create a plain literal
    pub fn literal(s: impl Into<String>) -> Self {
        Term::Literal(Arc::new(Literal::plain(s.into())))
    }

    /// Create a typed literal
    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal(Arc::new(Literal::typed(value.into(), datatype.into())))
    }

    /// Create a language-tagged literal
    pub fn lang_literal(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Term::Literal(Arc::new(Literal::with_language(value.into(), lang.into())))
    }

    /// Create a blank node with a label
    pub fn blank(label: impl Into<String>) -> Self {
        Term::BlankNode(BlankNode::labeled(label.into()))
    }

    /// Create a fresh blank node
    pub fn fresh_blank() -> Self {
        Term::BlankNode(BlankNode::fresh())
    }

    /// Get the URI if this is a URI term
    pub fn as_uri(&self) -> Option<&Uri> {
        match self {
            Term::Uri(u) => Some(u),
            _ => None,
        }
    }

    /// Get the literal if this is a literal term
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(l) => Some(l),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Term::BlankNode(_))
    }

    /// Whether the term may stand in subject position
    pub fn is_resource(&self) -> bool {
        !self.is_literal()
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Uri(u) => write!(f, "{:?}", u),
            Term::Literal(l) => write!(f, "{:?}", l),
            Term::BlankNode(b) => write!(f, "{:?}", b),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Uri(u) => write!(f, "{}", u),
            Term::Literal(l) => write!(f, "{}", l),
            Term::BlankNode(b) => write!(f, "{}", b),
        }
    }
}

impl From<Uri> for Term {
    fn from(uri: Uri) -> Self {
        Term::Uri(Arc::new(uri))
    }
}

/// A triple (statement) in RDF
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Triple { subject, predicate, object }
    }

    /// Check whether a term occurs in subject or object position
    pub fn mentions(&self, term: &Term) -> bool {
        &self.subject == term || &self.object == term
    }
}

impl fmt::Debug for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:?} {:?} .", self.subject, self.predicate, self.object)
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_creation() {
        let uri = Term::uri("http://example.org/foo");
        assert!(matches!(uri, Term::Uri(_)));

        let lit = Term::literal("hello");
        assert!(lit.is_literal());
        assert!(!lit.is_resource());

        let blank = Term::blank("b1");
        assert!(blank.is_blank());
    }

    #[test]
    fn test_term_ordering() {
        let a = Term::uri("http://example.org/a");
        let b = Term::uri("http://example.org/b");
        assert!(a < b);
        assert!(b < Term::fresh_blank());
        assert!(Term::fresh_blank() < Term::literal("a"));
    }

    #[test]
    fn test_triple_display() {
        let t = Triple::new(
            Term::uri("http://example.org/s"),
            Term::uri("http://example.org/p"),
            Term::literal("o"),
        );
        assert_eq!(t.to_string(), "<http://example.org/s> <http://example.org/p> \"o\" .");
        assert!(t.mentions(&Term::uri("http://example.org/s")));
        assert!(!t.mentions(&Term::uri("http://example.org/p")));
    }
}
