//! Shape targets and constrained paths
//!
//! The fusion engine only needs three things from a shape: the nodes it
//! targets in a data graph, the classes it targets, and the predicates its
//! property constraints range over. [`Shape`] is that capability;
//! [`NodeShape`] implements it for shapes read from a SHACL shapes graph by
//! [`ShapesGraph`].

use indexmap::IndexSet;
use tracing::debug;

use crate::core::vocab;
use crate::error::{FusionError, FusionResult};
use crate::store::Store;
use crate::term::Term;

/// What the fusion engine reads from a shape
pub trait Shape {
    /// Identifier of the shape node
    fn id(&self) -> &Term;

    /// Nodes selected by the shape's targets, evaluated against `data`
    fn focus_nodes(&self, data: &Store) -> IndexSet<Term>;

    /// Classes named by explicit class targets
    fn target_classes(&self) -> &[Term];

    /// Classes the shape targets by also being a class itself
    fn implicit_class_targets(&self) -> &[Term] {
        &[]
    }

    /// Predicates constrained by the shape's property shapes
    fn property_paths(&self) -> &[Term];
}

/// A SHACL target declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// `sh:targetClass`
    Class(Term),
    /// `sh:targetNode`
    Node(Term),
    /// `sh:targetSubjectsOf`
    SubjectsOf(Term),
    /// `sh:targetObjectsOf`
    ObjectsOf(Term),
}

/// A shape with its targets and flattened property paths
#[derive(Debug, Clone)]
pub struct NodeShape {
    id: Term,
    targets: Vec<Target>,
    target_classes: Vec<Term>,
    implicit_classes: Vec<Term>,
    paths: Vec<Term>,
}

impl NodeShape {
    pub fn new(id: Term) -> Self {
        NodeShape {
            id,
            targets: Vec::new(),
            target_classes: Vec::new(),
            implicit_classes: Vec::new(),
            paths: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.add_target(target);
        self
    }

    pub fn with_implicit_class(mut self, class: Term) -> Self {
        push_unique(&mut self.implicit_classes, class);
        self
    }

    pub fn with_path(mut self, predicate: Term) -> Self {
        push_unique(&mut self.paths, predicate);
        self
    }

    fn add_target(&mut self, target: Target) {
        if let Target::Class(class) = &target {
            push_unique(&mut self.target_classes, class.clone());
        }
        if !self.targets.contains(&target) {
            self.targets.push(target);
        }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }
}

fn push_unique(items: &mut Vec<Term>, item: Term) {
    if !items.contains(&item) {
        items.push(item);
    }
}

/// Instances of `class`, including instances of its transitive subclasses
fn instances_of(data: &Store, class: &Term, into: &mut IndexSet<Term>) {
    let v = vocab();
    let mut classes = data.transitive_subjects(&v.sub_class_of, class);
    classes.insert(class.clone());
    for c in &classes {
        into.extend(data.subjects(&v.rdf_type, c));
    }
}

impl Shape for NodeShape {
    fn id(&self) -> &Term {
        &self.id
    }

    fn focus_nodes(&self, data: &Store) -> IndexSet<Term> {
        let mut nodes = IndexSet::new();
        for target in &self.targets {
            match target {
                Target::Class(class) => instances_of(data, class, &mut nodes),
                Target::Node(node) => {
                    nodes.insert(node.clone());
                }
                Target::SubjectsOf(p) => {
                    nodes.extend(data.subject_objects(p).into_iter().map(|(s, _)| s));
                }
                Target::ObjectsOf(p) => {
                    nodes.extend(data.subject_objects(p).into_iter().map(|(_, o)| o));
                }
            }
        }
        for class in &self.implicit_classes {
            instances_of(data, class, &mut nodes);
        }
        // Literal values have no identity to merge
        nodes.retain(|n| n.is_resource());
        nodes
    }

    fn target_classes(&self) -> &[Term] {
        &self.target_classes
    }

    fn implicit_class_targets(&self) -> &[Term] {
        &self.implicit_classes
    }

    fn property_paths(&self) -> &[Term] {
        &self.paths
    }
}

/// Shapes harvested from a SHACL shapes graph
#[derive(Debug, Clone, Default)]
pub struct ShapesGraph {
    shapes: Vec<NodeShape>,
}

impl ShapesGraph {
    /// Read every shape declared in `graph`
    ///
    /// A shape is a `sh:NodeShape` instance, or any node carrying a target
    /// or a `sh:property`. Fails when no shape is found, when a property
    /// shape has no `sh:path`, or when a path names no predicate.
    pub fn from_store(graph: &Store) -> FusionResult<Self> {
        let v = vocab();

        let mut ids: IndexSet<Term> = IndexSet::new();
        ids.extend(graph.subjects(&v.rdf_type, &v.node_shape));
        for p in [
            &v.target_class,
            &v.target_node,
            &v.target_subjects_of,
            &v.target_objects_of,
            &v.property,
        ] {
            ids.extend(graph.subject_objects(p).into_iter().map(|(s, _)| s));
        }
        // Property shapes with their own targets stand alone
        for s in graph.subjects(&v.rdf_type, &v.property_shape) {
            if graph.subjects(&v.property, &s).is_empty() {
                ids.insert(s);
            }
        }

        if ids.is_empty() {
            return Err(FusionError::input_shape("shapes graph declares no shapes"));
        }

        let mut shapes = Vec::with_capacity(ids.len());
        for id in ids {
            shapes.push(Self::read_shape(graph, id)?);
        }
        debug!(shapes = shapes.len(), "harvested shapes");
        Ok(ShapesGraph { shapes })
    }

    fn read_shape(graph: &Store, id: Term) -> FusionResult<NodeShape> {
        let v = vocab();
        let mut shape = NodeShape::new(id.clone());

        for class in graph.objects(&id, &v.target_class) {
            shape.add_target(Target::Class(class));
        }
        for node in graph.objects(&id, &v.target_node) {
            shape.add_target(Target::Node(node));
        }
        for p in graph.objects(&id, &v.target_subjects_of) {
            shape.add_target(Target::SubjectsOf(p));
        }
        for p in graph.objects(&id, &v.target_objects_of) {
            shape.add_target(Target::ObjectsOf(p));
        }
        if graph.has(&id, &v.rdf_type, &v.rdfs_class) || graph.has(&id, &v.rdf_type, &v.owl_class) {
            shape = shape.with_implicit_class(id.clone());
        }

        let mut property_shapes = graph.objects(&id, &v.property);
        if !graph.objects(&id, &v.path).is_empty() {
            property_shapes.push(id.clone());
        }
        for property_shape in property_shapes {
            let paths = graph.objects(&property_shape, &v.path);
            if paths.is_empty() {
                return Err(FusionError::shape(&id, format!("property shape {} has no sh:path", property_shape)));
            }
            for path in paths {
                let mut predicates = Vec::new();
                flatten_path(graph, &path, &mut predicates, 0)
                    .map_err(|message| FusionError::shape(&id, message))?;
                for predicate in predicates {
                    shape = shape.with_path(predicate);
                }
            }
        }

        Ok(shape)
    }

    pub fn shapes(&self) -> &[NodeShape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn into_shapes(self) -> Vec<NodeShape> {
        self.shapes
    }
}

const MAX_PATH_DEPTH: usize = 32;

/// Collect the predicate IRIs a SHACL property path ranges over
fn flatten_path(graph: &Store, path: &Term, out: &mut Vec<Term>, depth: usize) -> Result<(), String> {
    let v = vocab();
    if depth > MAX_PATH_DEPTH {
        return Err(format!("property path {} nests too deeply", path));
    }

    match path {
        Term::Uri(_) if *path == v.rdf_nil => Ok(()),
        Term::Uri(_) => {
            push_unique(out, path.clone());
            Ok(())
        }
        Term::Literal(_) => Err(format!("property path {} is a literal", path)),
        Term::BlankNode(_) => {
            // Sequence path: an RDF list
            if !graph.objects(path, &v.rdf_first).is_empty() {
                for item in graph.objects(path, &v.rdf_first) {
                    flatten_path(graph, &item, out, depth + 1)?;
                }
                for rest in graph.objects(path, &v.rdf_rest) {
                    flatten_path(graph, &rest, out, depth + 1)?;
                }
                return Ok(());
            }

            let mut found = false;
            for wrapper in [
                &v.inverse_path,
                &v.alternative_path,
                &v.zero_or_more_path,
                &v.one_or_more_path,
                &v.zero_or_one_path,
            ] {
                for inner in graph.objects(path, wrapper) {
                    found = true;
                    flatten_path(graph, &inner, out, depth + 1)?;
                }
            }
            if found {
                Ok(())
            } else {
                Err(format!("unsupported property path {:?}", path))
            }
        }
    }
}
