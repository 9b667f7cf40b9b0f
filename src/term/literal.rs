//! Literal value representation

use std::fmt;

/// Datatype for a literal
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Datatype {
    /// Plain literal (no datatype)
    Plain,
    /// Language-tagged literal
    Language(String),
    /// Typed literal with datatype URI
    Typed(String),
}

/// An RDF literal value
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    value: String,
    datatype: Datatype,
}

impl Literal {
    /// Create a plain literal
    pub fn plain(value: String) -> Self {
        Literal {
            value,
            datatype: Datatype::Plain,
        }
    }

    /// Create a typed literal
    ///
    /// `xsd:string` is folded into a plain literal, which is how RDF 1.1
    /// treats simple literals.
    pub fn typed(value: String, datatype: String) -> Self {
        if datatype == XSD_STRING {
            return Literal::plain(value);
        }
        Literal {
            value,
            datatype: Datatype::Typed(datatype),
        }
    }

    /// Create a language-tagged literal
    pub fn with_language(value: String, lang: String) -> Self {
        Literal {
            value,
            datatype: Datatype::Language(lang.to_lowercase()),
        }
    }

    /// Get the lexical value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Get the datatype
    pub fn datatype(&self) -> &Datatype {
        &self.datatype
    }

    /// Check if this is a plain literal
    pub fn is_plain(&self) -> bool {
        matches!(self.datatype, Datatype::Plain)
    }

    /// Get the language tag if present
    pub fn language(&self) -> Option<&str> {
        match &self.datatype {
            Datatype::Language(lang) => Some(lang),
            _ => None,
        }
    }

    /// Get the datatype URI if present
    pub fn datatype_uri(&self) -> Option<&str> {
        match &self.datatype {
            Datatype::Typed(uri) => Some(uri),
            _ => None,
        }
    }
}

const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// Escape a lexical form for N-Triples / Turtle output
pub(crate) fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.datatype {
            Datatype::Plain => write!(f, "\"{}\"", self.value),
            Datatype::Language(lang) => write!(f, "\"{}\"@{}", self.value, lang),
            Datatype::Typed(dt) => write!(f, "\"{}\"^^<{}>", self.value, dt),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = escape(&self.value);
        match &self.datatype {
            Datatype::Plain => write!(f, "\"{}\"", value),
            Datatype::Language(lang) => write!(f, "\"{}\"@{}", value, lang),
            Datatype::Typed(dt) => write!(f, "\"{}\"^^<{}>", value, dt),
        }
    }
}
