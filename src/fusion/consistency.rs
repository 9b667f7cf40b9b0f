//! Contradiction detection
//!
//! Stateless checks over a store. Each returns the first violation found as
//! a [`FusionError`] naming the rule and the terms involved.
//!
//! | Rule | Pattern |
//! |------|---------|
//! | cls-com | `C1 owl:complementOf C2`, `X a C1`, `X a C2` |
//! | cax-dw | `C1 owl:disjointWith C2`, `X a C1`, `X a C2` |
//! | prp-irp | `P a owl:IrreflexiveProperty`, `X P X` |
//! | prp-asyp | `P a owl:AsymmetricProperty`, `X P Y`, `Y P X` |
//! | prp-pdw | `P1 owl:propertyDisjointWith P2`, `X P1 Y`, `X P2 Y` |
//! | eq-diff1 | `X owl:sameAs Y`, `X owl:differentFrom Y` |

use indexmap::IndexSet;

use crate::core::vocab;
use crate::error::{FusionError, FusionResult};
use crate::fusion::scope::Scope;
use crate::store::Store;
use crate::term::Term;

/// Terms linked to `term` through `predicate` in either direction
fn linked(store: &Store, term: &Term, predicate: &Term) -> Vec<Term> {
    let mut found: IndexSet<Term> = store.objects(term, predicate).into_iter().collect();
    found.extend(store.subjects(predicate, term));
    let mut found: Vec<Term> = found.into_iter().collect();
    found.sort();
    found
}

fn sorted_instances(store: &Store, class: &Term) -> Vec<Term> {
    let mut instances = store.subjects(&vocab().rdf_type, class);
    instances.sort();
    instances
}

/// Complement and disjointness of every class in `classes`
pub fn check_classes<'a>(store: &Store, classes: impl IntoIterator<Item = &'a Term>) -> FusionResult<()> {
    let v = vocab();
    for class in classes {
        for complement in linked(store, class, &v.complement_of) {
            for individual in sorted_instances(store, class) {
                if store.has(&individual, &v.rdf_type, &complement) {
                    return Err(FusionError::ClassComplementViolation {
                        class: class.clone(),
                        complement,
                        individual,
                    });
                }
            }
        }
        for disjoint in linked(store, class, &v.disjoint_with) {
            for individual in sorted_instances(store, class) {
                if store.has(&individual, &v.rdf_type, &disjoint) {
                    return Err(FusionError::ClassDisjointnessViolation {
                        class: class.clone(),
                        disjoint,
                        individual,
                    });
                }
            }
        }
    }
    Ok(())
}

pub fn check_irreflexive(store: &Store, property: &Term) -> FusionResult<()> {
    let v = vocab();
    if !store.has(property, &v.rdf_type, &v.irreflexive_property) {
        return Ok(());
    }
    match store.subject_objects(property).into_iter().filter(|(s, o)| s == o).min() {
        Some((node, _)) => Err(FusionError::IrreflexivityViolation { property: property.clone(), node }),
        None => Ok(()),
    }
}

pub fn check_asymmetric(store: &Store, property: &Term) -> FusionResult<()> {
    let v = vocab();
    if !store.has(property, &v.rdf_type, &v.asymmetric_property) {
        return Ok(());
    }
    let violation = store
        .subject_objects(property)
        .into_iter()
        .filter(|(s, o)| store.has(o, property, s))
        .min();
    match violation {
        Some((subject, object)) => Err(FusionError::AsymmetryViolation {
            property: property.clone(),
            subject,
            object,
        }),
        None => Ok(()),
    }
}

/// Pairs related by `property` and by a property disjoint with it
pub fn check_property_disjointness(store: &Store, property: &Term) -> FusionResult<()> {
    let v = vocab();
    for disjoint in linked(store, property, &v.property_disjoint_with) {
        let mut pairs = store.subject_objects(property);
        pairs.sort();
        for (subject, object) in pairs {
            if store.has(&subject, &disjoint, &object) {
                return Err(FusionError::PropertyDisjointnessViolation {
                    property: property.clone(),
                    disjoint,
                    subject,
                    object,
                });
            }
        }
    }
    Ok(())
}

/// `left` and `right` may not be declared different
///
/// A node declared different from itself conflicts with its own identity.
pub fn check_identity(store: &Store, left: &Term, right: &Term) -> FusionResult<()> {
    let v = vocab();
    if store.has(left, &v.different_from, right) || store.has(right, &v.different_from, left) {
        return Err(FusionError::IdentityConflict {
            left: left.clone(),
            right: right.clone(),
        });
    }
    Ok(())
}

/// Every check over the whole scope, plus every surviving `sameAs` pair
pub fn audit(store: &Store, scope: &Scope) -> FusionResult<()> {
    let v = vocab();

    let mut classes: Vec<&Term> = scope.target_classes.iter().collect();
    classes.sort();
    check_classes(store, classes)?;

    for property in scope.sorted_properties() {
        check_irreflexive(store, &property)?;
        check_asymmetric(store, &property)?;
        check_property_disjointness(store, &property)?;
    }

    let mut same = store.subject_objects(&v.same_as);
    same.sort();
    for (left, right) in same {
        check_identity(store, &left, &right)?;
    }
    for node in scope.sorted_focus_nodes() {
        check_identity(store, &node, &node)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::parser::parse;

    fn ex(local: &str) -> Term {
        Term::uri(format!("http://example.org/ns#{}", local))
    }

    fn store(body: &str) -> Store {
        parse(&format!("@prefix : <http://example.org/ns#> .\n{}", body)).unwrap().into_store()
    }

    #[test]
    fn test_complement_checked_from_either_side() {
        let data = store(r#"
            :Dead owl:complementOf :Alive .
            :cat a :Alive, :Dead .
        "#);
        let err = check_classes(&data, [&ex("Alive")]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ClassComplementViolation);
        assert_eq!(err.rule(), Some("cls-com"));
        assert!(err.terms().contains(&&ex("cat")));

        assert!(check_classes(&data, [&ex("Dead")]).is_err());
        assert!(check_classes(&data, [&ex("Other")]).is_ok());
    }

    #[test]
    fn test_disjoint_classes() {
        let data = store(r#"
            :Cat owl:disjointWith :Dog .
            :rex a :Dog .
            :tom a :Cat .
        "#);
        assert!(check_classes(&data, [&ex("Cat"), &ex("Dog")]).is_ok());

        let mut data = data;
        data.insert(&ex("rex"), &vocab().rdf_type, &ex("Cat"));
        let err = check_classes(&data, [&ex("Dog")]).unwrap_err();
        assert_eq!(err.rule(), Some("cax-dw"));
    }

    #[test]
    fn test_irreflexive_and_asymmetric() {
        let data = store(r#"
            :parentOf a owl:IrreflexiveProperty, owl:AsymmetricProperty .
            :a :parentOf :b .
        "#);
        assert!(check_irreflexive(&data, &ex("parentOf")).is_ok());
        assert!(check_asymmetric(&data, &ex("parentOf")).is_ok());

        let mut looped = data.clone();
        looped.insert(&ex("c"), &ex("parentOf"), &ex("c"));
        let err = check_irreflexive(&looped, &ex("parentOf")).unwrap_err();
        assert_eq!(err, FusionError::IrreflexivityViolation { property: ex("parentOf"), node: ex("c") });

        let mut both = data;
        both.insert(&ex("b"), &ex("parentOf"), &ex("a"));
        let err = check_asymmetric(&both, &ex("parentOf")).unwrap_err();
        assert_eq!(
            err,
            FusionError::AsymmetryViolation { property: ex("parentOf"), subject: ex("a"), object: ex("b") }
        );
    }

    #[test]
    fn test_property_disjointness() {
        let data = store(r#"
            :likes owl:propertyDisjointWith :hates .
            :a :likes :b .
            :a :hates :c .
        "#);
        assert!(check_property_disjointness(&data, &ex("hates")).is_ok());

        let mut data = data;
        data.insert(&ex("a"), &ex("hates"), &ex("b"));
        assert_eq!(
            check_property_disjointness(&data, &ex("hates")).unwrap_err().code(),
            ErrorCode::PropertyDisjointnessViolation
        );
    }

    #[test]
    fn test_identity_conflicts() {
        let data = store(r#"
            :a owl:differentFrom :b .
            :c owl:differentFrom :c .
        "#);
        assert!(check_identity(&data, &ex("b"), &ex("a")).is_err());
        assert!(check_identity(&data, &ex("a"), &ex("c")).is_ok());
        assert!(check_identity(&data, &ex("c"), &ex("c")).is_err());
    }

    #[test]
    fn test_audit_covers_surviving_same_as() {
        let data = store(r#"
            :x owl:sameAs :y .
            :y owl:differentFrom :x .
        "#);
        let err = audit(&data, &Scope::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IdentityConflict);
    }
}
