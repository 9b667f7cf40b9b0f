//! RDF Dataset
//!
//! A dataset consists of a default graph and zero or more named graphs.
//! Each graph is an independent [`Store`]; fusion treats them separately.
//!
//! # Example
//!
//! ```ignore
//! use shape_fusion::store::Dataset;
//! use shape_fusion::term::{Term, Triple};
//!
//! let mut dataset = Dataset::new();
//! dataset.add(triple1);
//!
//! let graph_name = Term::uri("http://example.org/graph1");
//! dataset.add_to_graph(triple2, &graph_name);
//! ```

use std::fmt;

use indexmap::IndexMap;

use crate::term::{Term, Triple};
use super::Store;

/// A quad is a triple with an associated graph name
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Quad {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
    /// The graph this quad belongs to. None means the default graph.
    pub graph: Option<Term>,
}

impl Quad {
    /// Create a quad from a triple, optionally in a named graph
    pub fn from_triple(triple: Triple, graph: Option<Term>) -> Self {
        Quad {
            subject: triple.subject,
            predicate: triple.predicate,
            object: triple.object,
            graph,
        }
    }
}

impl fmt::Debug for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.graph {
            Some(g) => write!(f, "{:?} {:?} {:?} {:?} .", self.subject, self.predicate, self.object, g),
            None => write!(f, "{:?} {:?} {:?} .", self.subject, self.predicate, self.object),
        }
    }
}

/// N-Quads line form
impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.graph {
            Some(g) => write!(f, "{} {} {} {} .", self.subject, self.predicate, self.object, g),
            None => write!(f, "{} {} {} .", self.subject, self.predicate, self.object),
        }
    }
}

/// An RDF Dataset containing a default graph and named graphs
#[derive(Clone, Default, Debug)]
pub struct Dataset {
    /// The default (unnamed) graph
    default_graph: Store,
    /// Named graphs in insertion order
    named_graphs: IndexMap<Term, Store>,
}

impl Dataset {
    /// Create a new empty dataset
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a reference to the default graph
    pub fn default_graph(&self) -> &Store {
        &self.default_graph
    }

    /// Get a mutable reference to the default graph
    pub fn default_graph_mut(&mut self) -> &mut Store {
        &mut self.default_graph
    }

    /// Get a reference to a named graph, if it exists
    pub fn named_graph(&self, name: &Term) -> Option<&Store> {
        self.named_graphs.get(name)
    }

    /// Get a mutable reference to a named graph, creating it if it doesn't exist
    pub fn named_graph_mut(&mut self, name: &Term) -> &mut Store {
        self.named_graphs.entry(name.clone()).or_default()
    }

    /// Replace (or create) a named graph
    pub fn insert_graph(&mut self, name: Term, store: Store) -> Option<Store> {
        self.named_graphs.insert(name, store)
    }

    /// Get all graph names
    pub fn graph_names(&self) -> Vec<Term> {
        self.named_graphs.keys().cloned().collect()
    }

    /// Add a triple to the default graph
    pub fn add(&mut self, triple: Triple) -> bool {
        self.default_graph.add(triple)
    }

    /// Add a triple to a named graph
    pub fn add_to_graph(&mut self, triple: Triple, graph: &Term) -> bool {
        self.named_graph_mut(graph).add(triple)
    }

    /// Get total triple count across all graphs
    pub fn total_triple_count(&self) -> usize {
        let named_count: usize = self.named_graphs.values().map(Store::len).sum();
        self.default_graph.len() + named_count
    }

    /// Iterate over every graph, the default graph first
    pub fn graphs(&self) -> impl Iterator<Item = (Option<&Term>, &Store)> + '_ {
        std::iter::once((None, &self.default_graph))
            .chain(self.named_graphs.iter().map(|(name, store)| (Some(name), store)))
    }

    /// Take the dataset apart into its graphs, the default graph first
    pub fn into_graphs(self) -> Vec<(Option<Term>, Store)> {
        std::iter::once((None, self.default_graph))
            .chain(self.named_graphs.into_iter().map(|(name, store)| (Some(name), store)))
            .collect()
    }

    /// Iterate over all quads in the dataset
    pub fn iter_quads(&self) -> impl Iterator<Item = Quad> + '_ {
        self.graphs().flat_map(|(name, store)| {
            let name = name.cloned();
            store.iter().map(move |t| Quad::from_triple(t, name.clone()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(s: &str, o: &str) -> Triple {
        Triple::new(
            Term::uri(format!("http://example.org/{}", s)),
            Term::uri("http://example.org/p"),
            Term::uri(format!("http://example.org/{}", o)),
        )
    }

    #[test]
    fn test_default_and_named_graphs() {
        let mut dataset = Dataset::new();
        let g1 = Term::uri("http://example.org/g1");

        dataset.add(triple("a", "b"));
        dataset.add_to_graph(triple("c", "d"), &g1);
        dataset.add_to_graph(triple("e", "f"), &g1);

        assert_eq!(dataset.default_graph().len(), 1);
        assert_eq!(dataset.named_graph(&g1).map(Store::len), Some(2));
        assert_eq!(dataset.total_triple_count(), 3);
        assert_eq!(dataset.graph_names(), vec![g1]);
    }

    #[test]
    fn test_iter_quads_tags_graph() {
        let mut dataset = Dataset::new();
        let g1 = Term::uri("http://example.org/g1");
        dataset.add(triple("a", "b"));
        dataset.add_to_graph(triple("c", "d"), &g1);

        let quads: Vec<Quad> = dataset.iter_quads().collect();
        assert_eq!(quads.len(), 2);
        assert_eq!(quads[0].graph, None);
        assert_eq!(quads[1].graph, Some(g1));
    }

    #[test]
    fn test_into_graphs_order() {
        let mut dataset = Dataset::new();
        let g1 = Term::uri("http://example.org/g1");
        let g2 = Term::uri("http://example.org/g2");
        dataset.add_to_graph(triple("a", "b"), &g2);
        dataset.add_to_graph(triple("a", "b"), &g1);

        let names: Vec<Option<Term>> = dataset.into_graphs().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec![None, Some(g2), Some(g1)]);
    }
}
