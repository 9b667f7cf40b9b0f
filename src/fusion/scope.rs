//! The subgraph a set of shapes cares about

use indexmap::IndexSet;
use tracing::debug;

use crate::core::vocab;
use crate::shape::Shape;
use crate::store::Store;
use crate::term::Term;

/// Focus nodes, classes and properties relevant to a set of shapes
///
/// Every set only grows over a fusion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    /// Nodes selected by shape targets, or typed into a target class
    pub focus_nodes: IndexSet<Term>,
    /// Explicit and implicit target classes, closed under subclasses
    pub target_classes: IndexSet<Term>,
    /// Predicates of every constrained path
    pub properties: IndexSet<Term>,
    /// Predicates constrained by shapes without an explicit target class
    pub global_properties: IndexSet<Term>,
}

impl Scope {
    /// Evaluate the targets and paths of `shapes` against `store`
    pub fn extract<S: Shape>(store: &Store, shapes: &[S]) -> Self {
        let mut scope = Scope::default();
        scope.refresh(store, shapes);
        scope
    }

    /// Re-evaluate shape targets, keeping everything already in scope
    ///
    /// Returns how many new entries were added.
    pub fn refresh<S: Shape>(&mut self, store: &Store, shapes: &[S]) -> usize {
        let before = self.size();
        for shape in shapes {
            self.focus_nodes.extend(shape.focus_nodes(store));
            self.target_classes.extend(shape.target_classes().iter().cloned());
            self.target_classes.extend(shape.implicit_class_targets().iter().cloned());
            self.properties.extend(shape.property_paths().iter().cloned());
            if shape.target_classes().is_empty() {
                self.global_properties.extend(shape.property_paths().iter().cloned());
            }
        }
        let added = self.size() - before;
        if added > 0 {
            debug!(
                focus_nodes = self.focus_nodes.len(),
                classes = self.target_classes.len(),
                properties = self.properties.len(),
                "scope grew"
            );
        }
        added
    }

    /// Add every transitive subclass of a target class as a target class
    pub fn close_subclasses(&mut self, store: &Store) -> usize {
        let v = vocab();
        let mut added = 0;
        let mut pending: Vec<Term> = self.target_classes.iter().cloned().collect();
        while let Some(class) = pending.pop() {
            for sub in store.transitive_subjects(&v.sub_class_of, &class) {
                if self.target_classes.insert(sub.clone()) {
                    added += 1;
                    pending.push(sub);
                }
            }
        }
        added
    }

    /// Add a focus node; literals never become focus nodes
    pub fn add_focus(&mut self, node: &Term) -> bool {
        node.is_resource() && self.focus_nodes.insert(node.clone())
    }

    pub fn add_class(&mut self, class: &Term) -> bool {
        self.target_classes.insert(class.clone())
    }

    pub fn is_focus(&self, node: &Term) -> bool {
        self.focus_nodes.contains(node)
    }

    pub fn is_target_class(&self, class: &Term) -> bool {
        self.target_classes.contains(class)
    }

    pub fn is_relevant_property(&self, property: &Term) -> bool {
        self.properties.contains(property)
    }

    /// Subjects whose facts survive projection
    pub fn is_relevant_subject(&self, subject: &Term) -> bool {
        self.focus_nodes.contains(subject) || self.target_classes.contains(subject)
    }

    /// Focus nodes in ascending term order
    pub fn sorted_focus_nodes(&self) -> Vec<Term> {
        let mut nodes: Vec<Term> = self.focus_nodes.iter().cloned().collect();
        nodes.sort();
        nodes
    }

    /// Relevant properties in ascending term order
    pub fn sorted_properties(&self) -> Vec<Term> {
        let mut properties: Vec<Term> = self.properties.iter().cloned().collect();
        properties.sort();
        properties
    }

    /// Total number of entries across all sets
    pub fn size(&self) -> usize {
        self.focus_nodes.len() + self.target_classes.len() + self.properties.len() + self.global_properties.len()
    }
}
