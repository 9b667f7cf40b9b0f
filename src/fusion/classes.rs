//! Class equivalence propagation (cax-eqc1, cax-eqc2)

use indexmap::IndexSet;
use tracing::debug;

use crate::core::vocab;
use crate::fusion::scope::Scope;
use crate::store::Store;
use crate::term::Term;

/// Class equivalence engine
///
/// Discharged components are kept so that every later round can type
/// memberships derived after the declarations were deleted (by prp-dom,
/// prp-rng or a node merge) with the rest of the component.
#[derive(Debug, Clone, Default)]
pub struct ClassEquivalence {
    components: Vec<IndexSet<Term>>,
}

impl ClassEquivalence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every discharged equivalence component
    pub fn components(&self) -> &[IndexSet<Term>] {
        &self.components
    }

    /// Discharge the declarations reachable from the target classes, then
    /// type every instance of a logged component with each of its classes
    ///
    /// Equivalent classes join the target classes and their instances join
    /// the focus nodes. Returns the number of store mutations.
    pub fn run(&mut self, store: &mut Store, scope: &mut Scope) -> usize {
        let before = store.generation();

        let mut classes: Vec<Term> = scope.target_classes.iter().cloned().collect();
        classes.sort();

        for class in classes {
            let component = discharge_component(store, &class);
            if component.len() > 1 {
                self.absorb(component);
            }
        }

        for component in &self.components {
            merge_members(store, scope, component);
            for class in component {
                scope.add_class(class);
            }
        }

        (store.generation() - before) as usize
    }

    /// Log `component`, joining any logged component it overlaps
    fn absorb(&mut self, mut component: IndexSet<Term>) {
        let mut i = 0;
        while i < self.components.len() {
            if self.components[i].iter().any(|class| component.contains(class)) {
                component.extend(self.components.swap_remove(i));
            } else {
                i += 1;
            }
        }
        self.components.push(component);
    }
}

/// One-shot class equivalence propagation with no memory of earlier calls
pub fn propagate_equivalent_classes(store: &mut Store, scope: &mut Scope) -> usize {
    ClassEquivalence::new().run(store, scope)
}

/// Collect the equivalence component of `class`, deleting its declarations
fn discharge_component(store: &mut Store, class: &Term) -> IndexSet<Term> {
    let v = vocab();
    let mut component = IndexSet::new();
    component.insert(class.clone());
    let mut frontier = vec![class.clone()];

    while let Some(current) = frontier.pop() {
        let mut linked = store.objects(&current, &v.equivalent_class);
        linked.extend(store.subjects(&v.equivalent_class, &current));
        for other in linked {
            store.delete(&current, &v.equivalent_class, &other);
            store.delete(&other, &v.equivalent_class, &current);
            if other.is_resource() && component.insert(other.clone()) {
                debug!(rule = "cax-eqc", class = %current, equivalent = %other, "discharged class equivalence");
                frontier.push(other);
            }
        }
    }
    component
}

fn merge_members(store: &mut Store, scope: &mut Scope, component: &IndexSet<Term>) {
    let v = vocab();
    let mut members: IndexSet<Term> = IndexSet::new();
    for class in component {
        members.extend(store.subjects(&v.rdf_type, class));
    }
    for member in &members {
        for class in component {
            store.insert(member, &v.rdf_type, class);
        }
        scope.add_focus(member);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn ex(local: &str) -> Term {
        Term::uri(format!("http://example.org/ns#{}", local))
    }

    fn store(body: &str) -> Store {
        parse(&format!("@prefix : <http://example.org/ns#> .\n{}", body)).unwrap().into_store()
    }

    #[test]
    fn test_both_directions_are_typed() {
        let mut data = store(r#"
            :Human owl:equivalentClass :Person .
            :alice a :Person .
            :bob a :Human .
        "#);
        let mut scope = Scope::default();
        scope.add_class(&ex("Person"));
        scope.add_focus(&ex("alice"));

        assert!(propagate_equivalent_classes(&mut data, &mut scope) > 0);
        let t = &vocab().rdf_type;
        assert!(data.has(&ex("alice"), t, &ex("Human")));
        assert!(data.has(&ex("bob"), t, &ex("Person")));
        assert!(scope.is_focus(&ex("bob")));
        assert!(scope.is_target_class(&ex("Human")));
        assert!(data.subject_objects(&vocab().equivalent_class).is_empty());
    }

    #[test]
    fn test_equivalence_chain_is_followed() {
        let mut data = store(r#"
            :Person owl:equivalentClass :Human .
            :Human owl:equivalentClass :Mensch .
            :carl a :Mensch .
        "#);
        let mut scope = Scope::default();
        scope.add_class(&ex("Person"));

        propagate_equivalent_classes(&mut data, &mut scope);
        let t = &vocab().rdf_type;
        assert!(scope.is_target_class(&ex("Mensch")));
        assert!(data.has(&ex("carl"), t, &ex("Human")));
        assert!(data.has(&ex("carl"), t, &ex("Person")));
        assert!(scope.is_focus(&ex("carl")));
        assert_eq!(propagate_equivalent_classes(&mut data, &mut scope), 0);
    }

    #[test]
    fn test_quiet_without_declarations() {
        let mut data = store(":a a :Person .");
        let mut scope = Scope::default();
        scope.add_class(&ex("Person"));
        assert_eq!(propagate_equivalent_classes(&mut data, &mut scope), 0);
    }

    #[test]
    fn test_later_members_cross_discharged_equivalence() {
        let mut data = store(r#"
            :Human owl:equivalentClass :Person .
            :alice a :Person .
        "#);
        let mut scope = Scope::default();
        scope.add_class(&ex("Person"));

        let mut engine = ClassEquivalence::new();
        engine.run(&mut data, &mut scope);
        assert_eq!(engine.components().len(), 1);

        let t = vocab().rdf_type.clone();
        data.insert(&ex("dave"), &t, &ex("Human"));
        assert!(engine.run(&mut data, &mut scope) > 0);
        assert!(data.has(&ex("dave"), &t, &ex("Person")));
        assert!(scope.is_focus(&ex("dave")));
        assert_eq!(engine.run(&mut data, &mut scope), 0);
    }

    #[test]
    fn test_overlapping_components_are_joined() {
        let mut data = store(r#"
            :Human owl:equivalentClass :Person .
            :carl a :Mensch .
        "#);
        let mut scope = Scope::default();
        scope.add_class(&ex("Person"));

        let mut engine = ClassEquivalence::new();
        engine.run(&mut data, &mut scope);

        let eq = vocab().equivalent_class.clone();
        data.insert(&ex("Mensch"), &eq, &ex("Human"));
        engine.run(&mut data, &mut scope);

        assert_eq!(engine.components().len(), 1);
        assert_eq!(engine.components()[0].len(), 3);
        assert!(data.has(&ex("carl"), &vocab().rdf_type, &ex("Person")));
    }
}
