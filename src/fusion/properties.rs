//! Property rule engine
//!
//! Applies the property-level OWL 2 RL rules to one relevant property at a
//! time, in a fixed order:
//!
//! | Step | Rules |
//! |------|-------|
//! | characteristics | prp-irp, prp-asyp |
//! | subproperties | scm-spo, scm-dom2, scm-rng2, scm-eqp2, prp-spo1 |
//! | equivalence | prp-eqp1, prp-eqp2, eq-rep-p |
//! | disjointness | prp-pdw |
//! | symmetry | prp-symp |
//! | domain and range | prp-dom, prp-rng |
//! | functional | prp-fp, prp-ifp |
//!
//! Declarations are discharged once applied. The engine keeps a log of what
//! it discharged so that later rounds apply the same rewrite to facts that
//! appear after the declaration is gone.

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace};

use crate::core::vocab;
use crate::error::FusionResult;
use crate::fusion::consistency;
use crate::fusion::scope::Scope;
use crate::store::Store;
use crate::term::Term;

/// Rewrites discharged in earlier calls
#[derive(Debug, Clone, Default)]
struct RewriteLog {
    /// (sub, super) pairs
    sub_properties: IndexSet<(Term, Term)>,
    /// (from, to) redirections of properties outside the scope
    redirected: IndexSet<(Term, Term)>,
    /// (property, equivalent) pairs whose facts are mirrored
    mirrored: IndexSet<(Term, Term)>,
    symmetric: IndexSet<Term>,
    functional: IndexSet<Term>,
    inverse_functional: IndexSet<Term>,
}

/// Statistics about property rewriting
#[derive(Clone, Debug, Default)]
pub struct PropertyStats {
    pub applications: usize,
    pub rewrites: usize,
    pub identities: usize,
}

#[derive(Debug, Default)]
pub struct PropertyRuleEngine {
    log: RewriteLog,
    stats: PropertyStats,
}

impl PropertyRuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &PropertyStats {
        &self.stats
    }

    /// Apply every rule to every relevant property, in term order
    pub fn run(&mut self, store: &mut Store, scope: &mut Scope) -> FusionResult<usize> {
        let mut mutations = 0;
        for property in scope.sorted_properties() {
            mutations += self.apply(store, scope, &property)?;
        }
        Ok(mutations)
    }

    /// Apply every rule to one property; returns the number of store mutations
    pub fn apply(&mut self, store: &mut Store, scope: &mut Scope, property: &Term) -> FusionResult<usize> {
        let before = store.generation();
        self.stats.applications += 1;

        check_characteristics(store, property)?;

        self.close_subproperties(store, property);
        check_characteristics(store, property)?;

        self.merge_equivalents(store, scope, property)?;
        check_characteristics(store, property)?;

        consistency::check_property_disjointness(store, property)?;

        if self.symmetrize(store, property) {
            check_characteristics(store, property)?;
        }

        type_domain_and_range(store, scope, property);
        consistency::check_classes(store, scope.target_classes.iter())?;

        self.record_identities(store, scope, property);

        Ok((store.generation() - before) as usize)
    }

    fn close_subproperties(&mut self, store: &mut Store, property: &Term) {
        let v = vocab();
        let mut discharged: IndexSet<Term> = IndexSet::new();

        store.delete(property, &v.sub_property_of, property);
        loop {
            let mut subs = store.subjects(&v.sub_property_of, property);
            if subs.is_empty() {
                break;
            }
            subs.sort();

            for sub in subs {
                if sub == *property {
                    store.delete(property, &v.sub_property_of, property);
                    continue;
                }

                if discharged.contains(&sub) {
                    propagate_sub_facts(store, &sub, property);
                    store.delete(&sub, &v.sub_property_of, property);
                    continue;
                }

                if store.has(property, &v.sub_property_of, &sub) {
                    debug!(rule = "scm-eqp2", property = %property, equivalent = %sub, "mutual subproperties");
                    store.insert(property, &v.same_as, &sub);
                    store.delete(&sub, &v.sub_property_of, property);
                    store.delete(property, &v.sub_property_of, &sub);
                    discharged.insert(sub);
                    self.stats.rewrites += 1;
                    continue;
                }

                for grand in store.subjects(&v.sub_property_of, &sub) {
                    if grand != *property {
                        store.insert(&grand, &v.sub_property_of, property);
                    }
                }
                for domain in store.objects(property, &v.domain) {
                    store.insert(&sub, &v.domain, &domain);
                }
                for range in store.objects(property, &v.range) {
                    store.insert(&sub, &v.range, &range);
                }
                let copied = propagate_sub_facts(store, &sub, property);
                store.delete(&sub, &v.sub_property_of, property);
                debug!(rule = "prp-spo1", sub = %sub, property = %property, facts = copied, "discharged subproperty");

                self.log.sub_properties.insert((sub.clone(), property.clone()));
                discharged.insert(sub);
                self.stats.rewrites += 1;
            }
        }

        for (sub, sup) in self.log.sub_properties.iter().filter(|(_, sup)| sup == property) {
            propagate_sub_facts(store, sub, sup);
        }
    }

    fn merge_equivalents(&mut self, store: &mut Store, scope: &Scope, property: &Term) -> FusionResult<()> {
        let v = vocab();
        let mut merged: IndexSet<Term> = IndexSet::new();

        loop {
            for other in store.objects(property, &v.equivalent_property) {
                store.delete(property, &v.equivalent_property, &other);
                store.insert(property, &v.same_as, &other);
            }
            for other in store.subjects(&v.equivalent_property, property) {
                store.delete(&other, &v.equivalent_property, property);
                store.insert(property, &v.same_as, &other);
            }
            for other in store.subjects(&v.same_as, property) {
                store.delete(&other, &v.same_as, property);
                if other != *property {
                    store.insert(property, &v.same_as, &other);
                }
            }

            let mut pending = Vec::new();
            for other in store.objects(property, &v.same_as) {
                if other == *property || other.is_literal() || merged.contains(&other) {
                    store.delete(property, &v.same_as, &other);
                } else {
                    pending.push(other);
                }
            }
            if pending.is_empty() {
                break;
            }
            pending.sort();

            for other in pending {
                check_characteristics(store, &other)?;
                store.delete(property, &v.same_as, &other);

                if scope.is_relevant_property(&other) {
                    mirror(store, property, &other);
                    self.log.mirrored.insert((property.clone(), other.clone()));
                    debug!(rule = "prp-eqp", property = %property, equivalent = %other, "mirrored relevant property");
                } else {
                    let moved = store.replace_term(&other, property, true);
                    self.log.redirected.insert((other.clone(), property.clone()));
                    debug!(rule = "eq-rep-p", from = %other, to = %property, facts = moved, "redirected property");
                }
                merged.insert(other);
                self.stats.rewrites += 1;
            }
        }

        for (from, to) in self.log.redirected.iter().filter(|(_, to)| to == property) {
            store.replace_term(from, to, true);
        }
        for (p, q) in self.log.mirrored.iter().filter(|(p, q)| p == property || q == property) {
            mirror(store, p, q);
        }
        Ok(())
    }

    /// Close `property` under symmetry if declared; returns whether it fired
    fn symmetrize(&mut self, store: &mut Store, property: &Term) -> bool {
        let v = vocab();
        let declared = store.delete(property, &v.rdf_type, &v.symmetric_property);
        if !declared && !self.log.symmetric.contains(property) {
            return false;
        }

        let mut added = 0;
        for (subject, object) in store.subject_objects(property) {
            if object.is_literal() {
                trace!(property = %property, object = %object, "literal cannot be mirrored");
                continue;
            }
            if store.insert(&object, property, &subject) {
                added += 1;
            }
        }
        if declared {
            self.log.symmetric.insert(property.clone());
            self.stats.rewrites += 1;
        }
        debug!(rule = "prp-symp", property = %property, added, "symmetric closure");
        true
    }

    /// Record `sameAs` between values forced equal by (inverse) functionality
    ///
    /// The identified nodes join the focus nodes so that the merge engine
    /// collapses them.
    fn record_identities(&mut self, store: &mut Store, scope: &mut Scope, property: &Term) {
        let v = vocab();

        if store.delete(property, &v.rdf_type, &v.functional_property) {
            self.log.functional.insert(property.clone());
            self.stats.rewrites += 1;
        }
        if self.log.functional.contains(property) {
            let groups = group(store.subject_objects(property));
            let recorded = self.record_groups(store, scope, groups);
            if recorded > 0 {
                debug!(rule = "prp-fp", property = %property, recorded, "functional values identified");
            }
        }

        if store.delete(property, &v.rdf_type, &v.inverse_functional_property) {
            self.log.inverse_functional.insert(property.clone());
            self.stats.rewrites += 1;
        }
        if self.log.inverse_functional.contains(property) {
            let pairs = store.subject_objects(property).into_iter().map(|(s, o)| (o, s));
            let groups = group(pairs);
            let recorded = self.record_groups(store, scope, groups);
            if recorded > 0 {
                debug!(rule = "prp-ifp", property = %property, recorded, "inverse functional keys identified");
            }
        }
    }

    fn record_groups(&mut self, store: &mut Store, scope: &mut Scope, groups: IndexMap<Term, Vec<Term>>) -> usize {
        let same_as = &vocab().same_as;
        let mut recorded = 0;
        for (key, mut values) in groups {
            values.sort();
            values.dedup();
            if values.iter().any(Term::is_literal) {
                debug!(key = %key, "skipping literal values");
                values.retain(Term::is_resource);
            }
            if values.len() < 2 {
                continue;
            }
            for value in &values {
                scope.add_focus(value);
            }
            if let Some((first, rest)) = values.split_first() {
                for other in rest {
                    if store.insert(first, same_as, other) {
                        recorded += 1;
                    }
                }
            }
        }
        self.stats.identities += recorded;
        recorded
    }
}

fn check_characteristics(store: &Store, property: &Term) -> FusionResult<()> {
    consistency::check_irreflexive(store, property)?;
    consistency::check_asymmetric(store, property)
}

/// Copy every `x sub y` to `x property y`
fn propagate_sub_facts(store: &mut Store, sub: &Term, property: &Term) -> usize {
    store
        .subject_objects(sub)
        .into_iter()
        .filter(|(x, y)| store.insert(x, property, y))
        .count()
}

/// Make `p` and `q` carry the same facts, and give `p` the description of `q`
fn mirror(store: &mut Store, p: &Term, q: &Term) {
    let v = vocab();
    for (x, y) in store.subject_objects(q) {
        store.insert(&x, p, &y);
    }
    for (x, y) in store.subject_objects(p) {
        store.insert(&x, q, &y);
    }
    for (predicate, object) in store.predicate_objects(q) {
        if predicate == v.same_as || predicate == v.equivalent_property || object == *p {
            continue;
        }
        store.insert(p, &predicate, &object);
    }
}

fn group(pairs: impl IntoIterator<Item = (Term, Term)>) -> IndexMap<Term, Vec<Term>> {
    let mut groups: IndexMap<Term, Vec<Term>> = IndexMap::new();
    for (key, value) in pairs {
        groups.entry(key).or_default().push(value);
    }
    groups.retain(|_, values| values.len() > 1);
    groups.sort_keys();
    groups
}

/// Type subjects and objects of `property` with its domains and ranges
///
/// Values are typed unconditionally when the class is a target class, and
/// become focus nodes. Otherwise only existing focus nodes are typed.
fn type_domain_and_range(store: &mut Store, scope: &mut Scope, property: &Term) {
    let v = vocab();
    let pairs = store.subject_objects(property);

    for (classes, rule, by_subject) in [
        (store.objects(property, &v.domain), "prp-dom", true),
        (store.objects(property, &v.range), "prp-rng", false),
    ] {
        for class in classes {
            let targeted = scope.is_target_class(&class);
            let mut typed = 0;
            for (subject, object) in &pairs {
                let node = if by_subject { subject } else { object };
                if node.is_literal() {
                    continue;
                }
                if targeted {
                    scope.add_focus(node);
                } else if !scope.is_focus(node) {
                    continue;
                }
                if store.insert(node, &v.rdf_type, &class) {
                    typed += 1;
                }
            }
            if typed > 0 {
                debug!(rule, property = %property, class = %class, typed, "typed values");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FusionError;
    use crate::parser::parse;

    fn ex(local: &str) -> Term {
        Term::uri(format!("http://example.org/ns#{}", local))
    }

    fn store(body: &str) -> Store {
        parse(&format!("@prefix : <http://example.org/ns#> .\n{}", body)).unwrap().into_store()
    }

    fn scope_with(properties: &[&str], classes: &[&str], focus: &[&str]) -> Scope {
        let mut scope = Scope::default();
        scope.properties.extend(properties.iter().map(|p| ex(p)));
        scope.target_classes.extend(classes.iter().map(|c| ex(c)));
        scope.focus_nodes.extend(focus.iter().map(|f| ex(f)));
        scope
    }

    #[test]
    fn test_subproperty_facts_and_schema_propagate() {
        let mut data = store(r#"
            :hasMother rdfs:subPropertyOf :hasParent .
            :hasBirthMother rdfs:subPropertyOf :hasMother .
            :hasParent rdfs:domain :Person .
            :ann :hasMother :beth .
            :carl :hasBirthMother :dora .
        "#);
        let mut scope = scope_with(&["hasParent"], &[], &[]);
        let mut engine = PropertyRuleEngine::new();
        engine.apply(&mut data, &mut scope, &ex("hasParent")).unwrap();

        let v = vocab();
        assert!(data.has(&ex("ann"), &ex("hasParent"), &ex("beth")));
        assert!(data.has(&ex("carl"), &ex("hasParent"), &ex("dora")));
        assert!(data.has(&ex("hasMother"), &v.domain, &ex("Person")));
        assert!(data.subjects(&v.sub_property_of, &ex("hasParent")).is_empty());

        // Facts reaching a discharged subproperty later are still lifted
        data.insert(&ex("eve"), &ex("hasMother"), &ex("fay"));
        engine.apply(&mut data, &mut scope, &ex("hasParent")).unwrap();
        assert!(data.has(&ex("eve"), &ex("hasParent"), &ex("fay")));
    }

    #[test]
    fn test_mutual_subproperties_become_same_as() {
        let mut data = store(r#"
            :a rdfs:subPropertyOf :b .
            :b rdfs:subPropertyOf :a .
            :x :b :y .
        "#);
        let mut scope = scope_with(&["a"], &[], &[]);
        PropertyRuleEngine::new().apply(&mut data, &mut scope, &ex("a")).unwrap();

        let v = vocab();
        assert!(data.subject_objects(&v.sub_property_of).is_empty());
        assert!(data.subject_objects(&v.same_as).is_empty());
        assert!(data.has(&ex("x"), &ex("a"), &ex("y")));
        assert!(!data.mentions(&ex("b")));
    }

    #[test]
    fn test_subproperty_cycle_terminates() {
        let mut data = store(r#"
            :a rdfs:subPropertyOf :b .
            :b rdfs:subPropertyOf :c .
            :c rdfs:subPropertyOf :a .
            :a rdfs:subPropertyOf :a .
        "#);
        let mut scope = scope_with(&["a"], &[], &[]);
        PropertyRuleEngine::new().apply(&mut data, &mut scope, &ex("a")).unwrap();
        assert!(!data.has(&ex("a"), &vocab().sub_property_of, &ex("a")));
    }

    #[test]
    fn test_equivalent_property_outside_scope_is_redirected() {
        let mut data = store(r#"
            :name owl:equivalentProperty :label .
            :label rdfs:range xsd:string .
            :x :label "X" .
        "#);
        let mut scope = scope_with(&["name"], &[], &[]);
        PropertyRuleEngine::new().apply(&mut data, &mut scope, &ex("name")).unwrap();

        assert!(data.has(&ex("x"), &ex("name"), &Term::literal("X")));
        assert!(!data.mentions(&ex("label")));
        assert!(data.objects(&ex("name"), &vocab().range).len() == 1);
    }

    #[test]
    fn test_equivalent_relevant_property_is_mirrored() {
        let mut data = store(r#"
            :name owl:sameAs :fullName .
            :fullName a owl:FunctionalProperty .
            :x :name "X" .
            :y :fullName "Y" .
        "#);
        let mut scope = scope_with(&["fullName", "name"], &[], &[]);
        let mut engine = PropertyRuleEngine::new();
        engine.run(&mut data, &mut scope).unwrap();

        assert!(data.has(&ex("x"), &ex("fullName"), &Term::literal("X")));
        assert!(data.has(&ex("y"), &ex("name"), &Term::literal("Y")));
        assert!(data.subject_objects(&vocab().same_as).is_empty());
    }

    #[test]
    fn test_symmetric_closure_survives_discharge() {
        let mut data = store(r#"
            :knows a owl:SymmetricProperty .
            :a :knows :b .
            :c :knows "literal" .
        "#);
        let mut scope = scope_with(&["knows"], &[], &[]);
        let mut engine = PropertyRuleEngine::new();
        engine.apply(&mut data, &mut scope, &ex("knows")).unwrap();
        assert!(data.has(&ex("b"), &ex("knows"), &ex("a")));
        assert!(!data.has(&ex("knows"), &vocab().rdf_type, &vocab().symmetric_property));

        data.insert(&ex("d"), &ex("knows"), &ex("e"));
        engine.apply(&mut data, &mut scope, &ex("knows")).unwrap();
        assert!(data.has(&ex("e"), &ex("knows"), &ex("d")));
    }

    #[test]
    fn test_domain_typing_depends_on_target_classes() {
        let mut data = store(r#"
            :worksFor rdfs:domain :Employee ; rdfs:range :Company .
            :ann :worksFor :acme .
            :bob :worksFor :acme .
        "#);
        let mut scope = scope_with(&["worksFor"], &["Company"], &["ann"]);
        PropertyRuleEngine::new().apply(&mut data, &mut scope, &ex("worksFor")).unwrap();

        let t = &vocab().rdf_type;
        assert!(data.has(&ex("ann"), t, &ex("Employee")));
        assert!(!data.has(&ex("bob"), t, &ex("Employee")));
        assert!(data.has(&ex("acme"), t, &ex("Company")));
        assert!(scope.is_focus(&ex("acme")));
        assert!(!scope.is_focus(&ex("bob")));
    }

    #[test]
    fn test_functional_values_are_identified() {
        let mut data = store(r#"
            :mother a owl:FunctionalProperty .
            :ann :mother :beth, :elizabeth .
        "#);
        let mut scope = scope_with(&["mother"], &[], &[]);
        let mut engine = PropertyRuleEngine::new();
        engine.apply(&mut data, &mut scope, &ex("mother")).unwrap();

        assert!(data.has(&ex("beth"), &vocab().same_as, &ex("elizabeth")));
        assert_eq!(engine.stats().identities, 1);
        assert!(scope.is_focus(&ex("beth")));
        assert!(scope.is_focus(&ex("elizabeth")));
    }

    #[test]
    fn test_inverse_functional_shared_key() {
        let mut data = store(r#"
            :email a owl:InverseFunctionalProperty .
            :alice :email "a@example.org" .
            :Alice :email "a@example.org" .
        "#);
        let mut scope = scope_with(&["email"], &[], &[]);
        PropertyRuleEngine::new().apply(&mut data, &mut scope, &ex("email")).unwrap();
        assert!(data.has(&ex("Alice"), &vocab().same_as, &ex("alice")));
    }

    #[test]
    fn test_asymmetric_violation_after_symmetric_closure() {
        let mut data = store(r#"
            :rel a owl:SymmetricProperty, owl:AsymmetricProperty .
            :a :rel :b .
        "#);
        let mut scope = scope_with(&["rel"], &[], &[]);
        let err = PropertyRuleEngine::new().apply(&mut data, &mut scope, &ex("rel")).unwrap_err();
        assert!(matches!(err, FusionError::AsymmetryViolation { .. }));
    }
}
