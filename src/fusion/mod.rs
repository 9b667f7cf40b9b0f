//! Shape-scoped fusion
//!
//! Normalizes the part of a data graph that a set of shapes looks at:
//! closes it under the implemented OWL 2 RL rules, then merges individuals
//! linked by `owl:sameAs` into one canonical node each. A validator run over
//! the result sees a single de-duplicated graph.
//!
//! The [`Fusion`] driver alternates three engines until a whole round leaves
//! both the store and the scope unchanged:
//!
//! 1. class equivalence ([`classes`])
//! 2. property rules ([`properties`])
//! 3. node merging ([`nodes`])
//!
//! # Example
//!
//! ```ignore
//! use shape_fusion::{parse, Fusion, ShapesGraph};
//!
//! let data = parse(data_ttl)?.into_store();
//! let shapes = ShapesGraph::from_store(&parse(shapes_ttl)?.into_store())?;
//! let outcome = Fusion::new().run(data, shapes.shapes())?;
//! println!("{} facts, {} aliases", outcome.store.len(), outcome.aliases.alias_count());
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use crate::error::{FusionError, FusionResult};
use crate::shape::Shape;
use crate::store::{Dataset, Store};
use crate::term::Term;

pub mod classes;
pub mod consistency;
pub mod identity;
pub mod nodes;
pub mod projection;
pub mod properties;
pub mod scope;

pub use classes::{propagate_equivalent_classes, ClassEquivalence};
pub use identity::AliasMap;
pub use nodes::NodeMergeEngine;
pub use projection::Projection;
pub use properties::PropertyRuleEngine;
pub use scope::Scope;

/// What to return once the store is fused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FusionMode {
    /// The whole fused store
    #[default]
    Fuse,
    /// The fused store with out-of-scope facts deleted
    ProjectSubtractive,
    /// A fresh store holding only in-scope facts
    ProjectAdditive,
}

impl FusionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FusionMode::Fuse => "fuse",
            FusionMode::ProjectSubtractive => "project-subtractive",
            FusionMode::ProjectAdditive => "project-additive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fuse" => Some(FusionMode::Fuse),
            "project-subtractive" | "subtractive" => Some(FusionMode::ProjectSubtractive),
            "project-additive" | "additive" => Some(FusionMode::ProjectAdditive),
            _ => None,
        }
    }

    pub fn projection(&self) -> Option<Projection> {
        match self {
            FusionMode::Fuse => None,
            FusionMode::ProjectSubtractive => Some(Projection::Subtractive),
            FusionMode::ProjectAdditive => Some(Projection::Additive),
        }
    }
}

impl fmt::Display for FusionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a fusion run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FusionOptions {
    pub mode: FusionMode,
    /// Outer rounds allowed before giving up
    pub max_rounds: usize,
    /// Re-enter class equivalence on every round, not only the first.
    /// When off, memberships derived after round 1 are not typed across
    /// discharged equivalences.
    pub rerun_class_equivalence: bool,
    /// Run every consistency check once more on the final store
    pub final_audit: bool,
}

impl Default for FusionOptions {
    fn default() -> Self {
        FusionOptions {
            mode: FusionMode::Fuse,
            max_rounds: 64,
            rerun_class_equivalence: true,
            final_audit: true,
        }
    }
}

/// Statistics about a fusion run
#[derive(Clone, Debug, Default, Serialize)]
pub struct FusionStats {
    pub rounds: usize,
    pub merges: usize,
    pub property_rewrites: usize,
    pub identities_recorded: usize,
    pub facts_added: u64,
    pub facts_removed: u64,
    pub facts_before: usize,
    pub facts_after: usize,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

mod duration_millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
    }
}

impl fmt::Display for FusionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rounds: {}", self.rounds)?;
        writeln!(f, "Facts: {} -> {}", self.facts_before, self.facts_after)?;
        writeln!(f, "Facts added: {}", self.facts_added)?;
        writeln!(f, "Facts removed: {}", self.facts_removed)?;
        writeln!(f, "Property rewrites: {}", self.property_rewrites)?;
        writeln!(f, "Identities recorded: {}", self.identities_recorded)?;
        writeln!(f, "Merges: {}", self.merges)?;
        write!(f, "Time: {:.3} ms", self.elapsed.as_secs_f64() * 1000.0)
    }
}

/// A fused store and everything needed to interpret it
#[derive(Debug, Clone)]
pub struct FusionOutcome {
    pub store: Store,
    pub aliases: AliasMap,
    pub scope: Scope,
    pub stats: FusionStats,
}

/// The outer fixpoint driver
#[derive(Debug, Clone, Default)]
pub struct Fusion {
    options: FusionOptions,
}

impl Fusion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: FusionOptions) -> Self {
        Fusion { options }
    }

    pub fn options(&self) -> &FusionOptions {
        &self.options
    }

    /// Fuse `store` against `shapes`
    ///
    /// Fails on the first contradiction, or when the store is still changing
    /// after `max_rounds` rounds. No partial store is returned.
    pub fn run<S: Shape>(&self, mut store: Store, shapes: &[S]) -> FusionResult<FusionOutcome> {
        let span = info_span!("fusion", mode = %self.options.mode, shapes = shapes.len());
        let _enter = span.enter();

        let start = Instant::now();
        let facts_before = store.len();
        let (inserted_before, deleted_before) = (store.insertions(), store.deletions());

        let mut scope = Scope::extract(&store, shapes);
        scope.close_subclasses(&store);
        debug!(
            focus_nodes = scope.focus_nodes.len(),
            classes = scope.target_classes.len(),
            properties = scope.properties.len(),
            "extracted scope"
        );

        let mut aliases = AliasMap::new();
        let mut classes = ClassEquivalence::new();
        let mut properties = PropertyRuleEngine::new();
        let mut nodes = NodeMergeEngine::new();
        let mut rounds = 0;

        loop {
            if rounds >= self.options.max_rounds {
                return Err(FusionError::FixpointNotReached { rounds });
            }
            rounds += 1;
            let signature = (store.generation(), scope.size());

            if rounds == 1 || self.options.rerun_class_equivalence {
                classes.run(&mut store, &mut scope);
            }
            scope.refresh(&store, shapes);
            scope.close_subclasses(&store);

            let rewritten = properties.run(&mut store, &mut scope)?;
            let merged = nodes.run(&mut store, &scope, &mut aliases)?;
            info!(round = rounds, facts = store.len(), rewritten, merged, "fusion round");

            if (store.generation(), scope.size()) == signature {
                break;
            }
        }

        if self.options.final_audit {
            consistency::audit(&store, &scope)?;
        }

        let stats_added = store.insertions() - inserted_before;
        let stats_removed = store.deletions() - deleted_before;
        let store = match self.options.mode.projection() {
            Some(projection) => projection.apply(store, &scope),
            None => store,
        };

        let stats = FusionStats {
            rounds,
            merges: nodes.merges(),
            property_rewrites: properties.stats().rewrites,
            identities_recorded: properties.stats().identities,
            facts_added: stats_added,
            facts_removed: stats_removed,
            facts_before,
            facts_after: store.len(),
            elapsed: start.elapsed(),
        };
        info!(rounds, merges = stats.merges, facts = stats.facts_after, "fusion complete");

        Ok(FusionOutcome { store, aliases, scope, stats })
    }

    /// Fuse every graph of a dataset independently
    pub fn run_dataset<S: Shape>(
        &self,
        dataset: Dataset,
        shapes: &[S],
    ) -> FusionResult<Vec<(Option<Term>, FusionOutcome)>> {
        dataset
            .into_graphs()
            .into_iter()
            .map(|(name, store)| {
                let outcome = self.run(store, shapes)?;
                Ok((name, outcome))
            })
            .collect()
    }
}

/// Fuse with default options
pub fn fuse<S: Shape>(store: Store, shapes: &[S]) -> FusionResult<FusionOutcome> {
    Fusion::new().run(store, shapes)
}

/// Fuse each graph of `dataset` with default options
pub fn fuse_dataset<S: Shape>(dataset: Dataset, shapes: &[S]) -> FusionResult<Vec<(Option<Term>, FusionOutcome)>> {
    Fusion::new().run_dataset(dataset, shapes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vocab;
    use crate::error::ErrorCode;
    use crate::parser::parse;
    use crate::shape::{NodeShape, ShapesGraph, Target};
    use crate::term::Triple;

    const PREFIXES: &str = "@prefix : <http://example.org/ns#> .\n";

    fn ex(local: &str) -> Term {
        Term::uri(format!("http://example.org/ns#{}", local))
    }

    fn store(body: &str) -> Store {
        parse(&format!("{}{}", PREFIXES, body)).unwrap().into_store()
    }

    fn shapes(body: &str) -> Vec<NodeShape> {
        ShapesGraph::from_store(&store(body)).unwrap().into_shapes()
    }

    fn person_shapes() -> Vec<NodeShape> {
        shapes(r#"
            :PersonShape a sh:NodeShape ;
                sh:targetClass :Person ;
                sh:property [ sh:path :name ] ;
                sh:property [ sh:path :knows ] ;
                sh:property [ sh:path :email ] .
        "#)
    }

    #[test]
    fn test_subclass_and_same_as_scenario() {
        let data = store(r#"
            :Student rdfs:subClassOf :Person .
            :simon a :Student ; :name "Simon" .
            :semon :name "Semon" .
            :simon owl:sameAs :semon .
        "#);
        let outcome = fuse(data, &person_shapes()).unwrap();

        assert_eq!(outcome.aliases.canonical(&ex("semon")), &ex("simon"));
        assert!(outcome.scope.is_target_class(&ex("Student")));
        assert!(outcome.store.has(&ex("simon"), &vocab().rdf_type, &ex("Student")));
        assert!(outcome.store.has(&ex("simon"), &ex("name"), &Term::literal("Semon")));
        assert!(!outcome.store.mentions(&ex("semon")));
    }

    #[test]
    fn test_inverse_functional_scenario() {
        let data = store(r#"
            :email a owl:InverseFunctionalProperty .
            :alice a :Person ; :email "alice@example.org" ; :name "Alice" .
            :Alice a :Person ; :email "alice@example.org" ; :knows :bob .
        "#);
        let outcome = fuse(data, &person_shapes()).unwrap();

        let canonical = ex("Alice");
        assert_eq!(outcome.aliases.canonical(&ex("alice")), &canonical);
        assert!(outcome.store.has(&canonical, &ex("name"), &Term::literal("Alice")));
        assert!(outcome.store.has(&canonical, &ex("knows"), &ex("bob")));
        assert_eq!(outcome.store.objects(&canonical, &ex("email")).len(), 1);
        assert!(outcome.stats.merges >= 1);
    }

    #[test]
    fn test_fusion_is_idempotent() {
        let data = store(r#"
            :knows a owl:SymmetricProperty .
            :email a owl:InverseFunctionalProperty .
            :acquaintedWith rdfs:subPropertyOf :knows .
            :a a :Person ; :acquaintedWith :b ; :email "x" .
            :c a :Person ; :email "x" .
            :b a :Person .
        "#);
        let shapes = person_shapes();
        let once = fuse(data, &shapes).unwrap();
        let twice = fuse(once.store.clone(), &shapes).unwrap();

        assert_eq!(once.store.sorted(), twice.store.sorted());
        assert_eq!(twice.aliases.alias_count(), 0);
    }

    #[test]
    fn test_no_alias_survives() {
        let data = store(r#"
            :mother a owl:FunctionalProperty .
            :a a :Person ; :mother :m1, :m2 .
            :b a :Person ; owl:sameAs :c .
            :c owl:sameAs :d .
            :x :knows :d .
        "#);
        let shapes = shapes(r#"
            :S sh:targetClass :Person ;
                sh:property [ sh:path :mother ] ;
                sh:property [ sh:path :knows ] .
        "#);
        let outcome = fuse(data, &shapes).unwrap();

        assert!(outcome.aliases.alias_count() >= 2);
        for alias in outcome.aliases.aliases() {
            assert!(
                outcome.store.iter().all(|t| t.subject != *alias && t.object != *alias),
                "alias {} survived",
                alias
            );
        }
        assert!(outcome.store.has(&ex("x"), &ex("knows"), &ex("b")));
    }

    #[test]
    fn test_projections_are_equivalent() {
        let body = r#"
            :knows a owl:SymmetricProperty .
            :alice a :Person ; :knows :bob ; :age 30 .
            :bob :name "Bob" ; :likes :carol .
            :Person rdfs:comment "people" .
        "#;
        let shapes = shapes(r#"
            :PersonShape sh:targetClass :Person ; sh:property [ sh:path :knows ] .
            :Anywhere sh:targetNode :nobody ; sh:property [ sh:path :likes ] .
        "#);

        let run = |mode: FusionMode| {
            let options = FusionOptions { mode, ..FusionOptions::default() };
            Fusion::with_options(options).run(store(body), &shapes).unwrap()
        };
        let subtractive = run(FusionMode::ProjectSubtractive);
        let additive = run(FusionMode::ProjectAdditive);
        let full = run(FusionMode::Fuse);

        assert_eq!(subtractive.store.sorted(), additive.store.sorted());
        assert!(subtractive.store.has(&ex("bob"), &ex("likes"), &ex("carol")));
        assert!(!subtractive.store.has(&ex("bob"), &ex("name"), &Term::literal("Bob")));
        assert!(full.store.has(&ex("bob"), &ex("name"), &Term::literal("Bob")));
    }

    #[test]
    fn test_symmetric_closure_holds() {
        let data = store(r#"
            :knows a owl:SymmetricProperty .
            :a a :Person ; :knows :b, :c .
            :b :knows :d .
        "#);
        let outcome = fuse(data, &person_shapes()).unwrap();
        for (x, y) in outcome.store.subject_objects(&ex("knows")) {
            assert!(outcome.store.has(&y, &ex("knows"), &x), "missing {} knows {}", y, x);
        }
    }

    #[test]
    fn test_functional_closure_holds() {
        let data = store(r#"
            :email a owl:FunctionalProperty .
            :a a :Person ; :email :m1, :m2, :m3 .
        "#);
        let outcome = fuse(data, &person_shapes()).unwrap();
        assert_eq!(outcome.store.objects(&ex("a"), &ex("email")), vec![ex("m1")]);
        assert_eq!(outcome.aliases.canonical(&ex("m2")), &ex("m1"));
        assert_eq!(outcome.aliases.canonical(&ex("m3")), &ex("m1"));
    }

    #[test]
    fn test_asymmetry_contradiction_aborts() {
        let data = store(r#"
            :knows a owl:AsymmetricProperty .
            :a a :Person ; :knows :b .
            :b :knows :a .
        "#);
        let err = fuse(data, &person_shapes()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AsymmetryViolation);
        assert_eq!(err.rule(), Some("prp-asyp"));
    }

    #[test]
    fn test_identity_conflict_aborts() {
        let data = store(r#"
            :a a :Person ; owl:sameAs :b .
            :b owl:differentFrom :a .
        "#);
        let err = fuse(data, &person_shapes()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IdentityConflict);
    }

    #[test]
    fn test_round_budget() {
        let data = store(":a a :Person ; owl:sameAs :b .");
        let options = FusionOptions { max_rounds: 1, ..FusionOptions::default() };
        let err = Fusion::with_options(options).run(data, &person_shapes()).unwrap_err();
        assert_eq!(err, FusionError::FixpointNotReached { rounds: 1 });

        let quiet = store(":a a :Person .");
        let options = FusionOptions { max_rounds: 1, ..FusionOptions::default() };
        assert!(Fusion::with_options(options).run(quiet, &person_shapes()).is_ok());
    }

    #[test]
    fn test_equivalent_class_brings_in_focus_nodes() {
        let data = store(r#"
            :Human owl:equivalentClass :Person .
            :h1 a :Human ; owl:sameAs :h2 .
        "#);
        let outcome = fuse(data, &person_shapes()).unwrap();
        assert!(outcome.scope.is_focus(&ex("h1")));
        assert!(outcome.store.has(&ex("h1"), &vocab().rdf_type, &ex("Person")));
        assert_eq!(outcome.aliases.canonical(&ex("h2")), &ex("h1"));
    }

    fn employee_shapes() -> Vec<NodeShape> {
        shapes(r#"
            :EmployeeShape a sh:NodeShape ;
                sh:targetClass :Person ;
                sh:property [ sh:path :worksAt ] .
        "#)
    }

    const DOMAIN_TYPED_HUMAN: &str = r#"
        :Human owl:equivalentClass :Person .
        :worksAt rdfs:domain :Human .
        :x :worksAt :acme .
    "#;

    #[test]
    fn test_derived_membership_crosses_class_equivalence() {
        let outcome = fuse(store(DOMAIN_TYPED_HUMAN), &employee_shapes()).unwrap();
        let t = &vocab().rdf_type;
        assert!(outcome.store.has(&ex("x"), t, &ex("Human")));
        assert!(outcome.store.has(&ex("x"), t, &ex("Person")));
        assert!(outcome.stats.rounds >= 2);
    }

    #[test]
    fn test_class_equivalence_first_round_only() {
        let options = FusionOptions { rerun_class_equivalence: false, ..FusionOptions::default() };
        let outcome = Fusion::with_options(options)
            .run(store(DOMAIN_TYPED_HUMAN), &employee_shapes())
            .unwrap();
        let t = &vocab().rdf_type;
        assert!(outcome.store.has(&ex("x"), t, &ex("Human")));
        assert!(!outcome.store.has(&ex("x"), t, &ex("Person")));
    }

    #[test]
    fn test_derived_membership_exposes_disjointness() {
        let data = store(&format!(
            "{}\n:Person owl:disjointWith :Robot .\n:x a :Robot .",
            DOMAIN_TYPED_HUMAN
        ));
        let err = fuse(data, &employee_shapes()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ClassDisjointnessViolation);
        assert!(err.terms().contains(&&ex("x")));
    }

    #[test]
    fn test_final_audit_guards_untouched_same_as() {
        let body = r#"
            :a a :Person .
            :q owl:sameAs :r .
            :r owl:differentFrom :q .
        "#;
        let err = fuse(store(body), &person_shapes()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IdentityConflict);

        let options = FusionOptions { final_audit: false, ..FusionOptions::default() };
        let outcome = Fusion::with_options(options).run(store(body), &person_shapes()).unwrap();
        assert!(outcome.store.has(&ex("q"), &vocab().same_as, &ex("r")));
    }

    #[test]
    fn test_dataset_graphs_are_fused_independently() {
        let mut dataset = Dataset::new();
        dataset.add(Triple::new(ex("a"), vocab().rdf_type.clone(), ex("Person")));
        dataset.add(Triple::new(ex("a"), vocab().same_as.clone(), ex("b")));
        dataset.add_to_graph(Triple::new(ex("b"), vocab().rdf_type.clone(), ex("Person")), &ex("g"));

        let shape = NodeShape::new(ex("S")).with_target(Target::Class(ex("Person")));
        let outcomes = fuse_dataset(dataset, &[shape]).unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].1.aliases.alias_count(), 1);
        assert_eq!(outcomes[1].0, Some(ex("g")));
        assert_eq!(outcomes[1].1.aliases.alias_count(), 0);
    }
}
