//! Restrict a fused store to the shapes' scope
//!
//! Both projections keep the same facts: every fact whose subject is a focus
//! node or a target class, and every fact whose predicate is a global
//! property. Subtractive projection deletes the rest in place; additive
//! projection copies the kept facts into a fresh store.

use tracing::debug;

use crate::fusion::scope::Scope;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Subtractive,
    Additive,
}

impl Projection {
    pub fn apply(self, store: Store, scope: &Scope) -> Store {
        let before = store.len();
        let projected = match self {
            Projection::Subtractive => subtractive(store, scope),
            Projection::Additive => additive(&store, scope),
        };
        debug!(projection = ?self, before, after = projected.len(), "projected store");
        projected
    }
}

fn subtractive(mut store: Store, scope: &Scope) -> Store {
    for triple in store.triples() {
        if !scope.global_properties.contains(&triple.predicate) && !scope.is_relevant_subject(&triple.subject) {
            store.remove(&triple);
        }
    }
    store
}

fn additive(store: &Store, scope: &Scope) -> Store {
    let mut projected = Store::new();
    for subject in scope.focus_nodes.iter().chain(scope.target_classes.iter()) {
        for (predicate, object) in store.predicate_objects(subject) {
            projected.insert(subject, &predicate, &object);
        }
    }
    for predicate in &scope.global_properties {
        for (subject, object) in store.subject_objects(predicate) {
            projected.insert(&subject, predicate, &object);
        }
    }
    projected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::term::Term;

    fn ex(local: &str) -> Term {
        Term::uri(format!("http://example.org/ns#{}", local))
    }

    fn fixture() -> (Store, Scope) {
        let store = parse(r#"
            @prefix : <http://example.org/ns#> .
            :alice a :Person ; :name "Alice" ; :knows :bob .
            :bob :name "Bob" ; :knows :carol .
            :Person rdfs:label "Person" .
            :rex a :Dog .
        "#).unwrap().into_store();
        let mut scope = Scope::default();
        scope.focus_nodes.insert(ex("alice"));
        scope.target_classes.insert(ex("Person"));
        scope.properties.insert(ex("knows"));
        scope.global_properties.insert(ex("knows"));
        (store, scope)
    }

    #[test]
    fn test_projections_agree() {
        let (store, scope) = fixture();
        let subtracted = Projection::Subtractive.apply(store.clone(), &scope);
        let added = Projection::Additive.apply(store, &scope);

        assert_eq!(subtracted.sorted(), added.sorted());
        assert_eq!(subtracted.len(), 5);
    }

    #[test]
    fn test_global_property_facts_survive() {
        let (store, scope) = fixture();
        let projected = Projection::Additive.apply(store, &scope);
        assert!(projected.has(&ex("bob"), &ex("knows"), &ex("carol")));
        assert!(!projected.has(&ex("bob"), &ex("name"), &Term::literal("Bob")));
        assert!(!projected.mentions(&ex("rex")));
    }
}
