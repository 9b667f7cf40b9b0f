//! shape-fusion - SHACL-scoped OWL fusion
//!
//! Normalizes a data graph for validation against a set of SHACL shapes.
//! Within the part of the graph the shapes look at, the crate computes the
//! fixpoint of a curated subset of OWL 2 RL rules and merges individuals
//! linked by `owl:sameAs` into canonical nodes, so a validator sees one
//! de-duplicated, reasoning-complete graph.
//!
//! # Architecture
//!
//! - [`store::Store`] - interned triple store with snapshot queries
//! - [`shape::Shape`] - what fusion needs from a shape: targets and paths
//! - [`fusion::Fusion`] - outer fixpoint driver over the rule engines
//! - [`fusion::AliasMap`] - canonical node to merged-away identifiers
//!
//! # Rules
//!
//! - Classes: cax-eqc1, cax-eqc2, cls-com, cax-dw
//! - Properties: prp-symp, prp-asyp, prp-irp, prp-pdw, prp-fp, prp-ifp,
//!   prp-dom, prp-rng, prp-spo1, prp-eqp1, prp-eqp2
//! - Schema: scm-spo, scm-dom2, scm-rng2, scm-eqp2
//! - Identity: eq-sym, eq-rep-s, eq-rep-p, eq-rep-o, eq-diff1
//!
//! # Example
//!
//! ```rust,ignore
//! use shape_fusion::{fuse, parse, ShapesGraph};
//!
//! let data = parse(r#"
//!     @prefix : <http://example.org/> .
//!     :simon a :Person ; owl:sameAs :semon .
//!     :semon :name "Semon" .
//! "#)?.into_store();
//! let shapes = ShapesGraph::from_store(&parse(r#"
//!     @prefix : <http://example.org/> .
//!     :PersonShape sh:targetClass :Person ; sh:property [ sh:path :name ] .
//! "#)?.into_store())?;
//!
//! let outcome = fuse(data, shapes.shapes())?;
//! assert!(outcome.aliases.is_alias(&Term::uri("http://example.org/semon")));
//! ```

pub mod core;
pub mod config;
pub mod error;
pub mod format;
pub mod fusion;
pub mod parser;
pub mod shape;
pub mod store;
pub mod term;

// Re-export vocabulary
pub use crate::core::{ns, vocab, Vocab};

// Re-export term types
pub use term::{Term, Triple, Uri, Literal, Datatype, BlankNode};

// Re-export parser types
pub use parser::{parse, parse_with_base, ParseResult, ParseError, ParserState, TurtleParser};

// Re-export store types
pub use store::{Store, Dataset};
pub use store::dataset::Quad;

// Re-export shape types
pub use shape::{Shape, NodeShape, ShapesGraph, Target};

// Re-export fusion types
pub use fusion::{
    fuse, fuse_dataset, Fusion, FusionMode, FusionOptions, FusionOutcome, FusionStats,
    AliasMap, Scope, Projection, ClassEquivalence, PropertyRuleEngine, NodeMergeEngine,
};

// Re-export configuration types
pub use config::{FusionConfig, ConfigError, GeneralConfig, EngineConfig, OutputFormat, LogLevel};

// Re-export error types
pub use error::{FusionError, FusionResult, ErrorCode, ErrorResponse};
