//! RDF, RDFS, OWL, SHACL and XSD vocabulary
//!
//! The string constants are used by the parser and the serializers; the
//! fusion engine works on the prebuilt [`Vocab`] terms so that rule code
//! never formats an IRI in a hot loop.

use std::sync::OnceLock;

use crate::term::Term;

/// Standard namespace URI constants
pub mod ns {
    /// RDF namespace
    pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    /// RDF Schema namespace
    pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
    /// XML Schema Datatypes namespace
    pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
    /// OWL Web Ontology Language namespace
    pub const OWL: &str = "http://www.w3.org/2002/07/owl#";
    /// SHACL (Shapes Constraint Language)
    pub const SH: &str = "http://www.w3.org/ns/shacl#";

    /// Helper to construct a full URI from namespace and local name
    #[inline]
    pub fn uri(namespace: &str, local: &str) -> String {
        format!("{}{}", namespace, local)
    }

    /// Prefixes registered by default for output
    pub fn well_known() -> [(&'static str, &'static str); 5] {
        [
            ("rdf", RDF),
            ("rdfs", RDFS),
            ("xsd", XSD),
            ("owl", OWL),
            ("sh", SH),
        ]
    }
}

/// Prebuilt vocabulary terms
#[derive(Debug, Clone)]
pub struct Vocab {
    pub rdf_type: Term,
    pub rdf_first: Term,
    pub rdf_rest: Term,
    pub rdf_nil: Term,

    pub sub_class_of: Term,
    pub sub_property_of: Term,
    pub domain: Term,
    pub range: Term,

    pub same_as: Term,
    pub different_from: Term,
    pub equivalent_class: Term,
    pub equivalent_property: Term,
    pub complement_of: Term,
    pub disjoint_with: Term,
    pub property_disjoint_with: Term,
    pub symmetric_property: Term,
    pub asymmetric_property: Term,
    pub irreflexive_property: Term,
    pub functional_property: Term,
    pub inverse_functional_property: Term,

    pub node_shape: Term,
    pub property_shape: Term,
    pub target_class: Term,
    pub target_node: Term,
    pub target_subjects_of: Term,
    pub target_objects_of: Term,
    pub property: Term,
    pub path: Term,
    pub inverse_path: Term,
    pub alternative_path: Term,
    pub zero_or_more_path: Term,
    pub one_or_more_path: Term,
    pub zero_or_one_path: Term,
    pub rdfs_class: Term,
    pub owl_class: Term,
}

impl Vocab {
    fn build() -> Self {
        let rdf = |l: &str| Term::uri(ns::uri(ns::RDF, l));
        let rdfs = |l: &str| Term::uri(ns::uri(ns::RDFS, l));
        let owl = |l: &str| Term::uri(ns::uri(ns::OWL, l));
        let sh = |l: &str| Term::uri(ns::uri(ns::SH, l));

        Vocab {
            rdf_type: rdf("type"),
            rdf_first: rdf("first"),
            rdf_rest: rdf("rest"),
            rdf_nil: rdf("nil"),

            sub_class_of: rdfs("subClassOf"),
            sub_property_of: rdfs("subPropertyOf"),
            domain: rdfs("domain"),
            range: rdfs("range"),

            same_as: owl("sameAs"),
            different_from: owl("differentFrom"),
            equivalent_class: owl("equivalentClass"),
            equivalent_property: owl("equivalentProperty"),
            complement_of: owl("complementOf"),
            disjoint_with: owl("disjointWith"),
            property_disjoint_with: owl("propertyDisjointWith"),
            symmetric_property: owl("SymmetricProperty"),
            asymmetric_property: owl("AsymmetricProperty"),
            irreflexive_property: owl("IrreflexiveProperty"),
            functional_property: owl("FunctionalProperty"),
            inverse_functional_property: owl("InverseFunctionalProperty"),

            node_shape: sh("NodeShape"),
            property_shape: sh("PropertyShape"),
            target_class: sh("targetClass"),
            target_node: sh("targetNode"),
            target_subjects_of: sh("targetSubjectsOf"),
            target_objects_of: sh("targetObjectsOf"),
            property: sh("property"),
            path: sh("path"),
            inverse_path: sh("inversePath"),
            alternative_path: sh("alternativePath"),
            zero_or_more_path: sh("zeroOrMorePath"),
            one_or_more_path: sh("oneOrMorePath"),
            zero_or_one_path: sh("zeroOrOnePath"),
            rdfs_class: rdfs("Class"),
            owl_class: owl("Class"),
        }
    }
}

static VOCAB: OnceLock<Vocab> = OnceLock::new();

/// Shared vocabulary instance
pub fn vocab() -> &'static Vocab {
    VOCAB.get_or_init(Vocab::build)
}
