//! Indexed triple store
//!
//! Terms are interned into an arena and triples are kept as id triples with
//! subject, predicate and object indexes. Every lookup returns an owned
//! snapshot, so a caller can walk a result and mutate the store in the same
//! loop without invalidating anything.

use fnv::{FnvBuildHasher, FnvHashMap};
use indexmap::IndexSet;

use crate::term::{Term, Triple};

pub mod dataset;

pub use dataset::Dataset;

type FnvIndexSet<T> = IndexSet<T, FnvBuildHasher>;

/// Index of an interned term inside one store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(u32);

type Key = [TermId; 3];

/// A store of RDF triples (a single graph)
#[derive(Clone, Default)]
pub struct Store {
    /// Interned terms; never shrinks until `clear`
    terms: FnvIndexSet<Term>,
    /// The triples in this store
    triples: FnvIndexSet<Key>,
    /// Index by subject
    by_subject: FnvHashMap<TermId, FnvIndexSet<Key>>,
    /// Index by predicate
    by_predicate: FnvHashMap<TermId, FnvIndexSet<Key>>,
    /// Index by object
    by_object: FnvHashMap<TermId, FnvIndexSet<Key>>,
    /// Count of effective mutations
    generation: u64,
    insertions: u64,
    deletions: u64,
}

impl Store {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, term: &Term) -> TermId {
        if let Some(idx) = self.terms.get_index_of(term) {
            return TermId(idx as u32);
        }
        let (idx, _) = self.terms.insert_full(term.clone());
        TermId(idx as u32)
    }

    fn lookup(&self, term: &Term) -> Option<TermId> {
        self.terms.get_index_of(term).map(|idx| TermId(idx as u32))
    }

    fn term(&self, id: TermId) -> &Term {
        &self.terms[id.0 as usize]
    }

    fn materialize(&self, key: &Key) -> Triple {
        Triple::new(
            self.term(key[0]).clone(),
            self.term(key[1]).clone(),
            self.term(key[2]).clone(),
        )
    }

    /// Add a triple to the store; returns false if it was already present
    pub fn add(&mut self, triple: Triple) -> bool {
        self.insert(&triple.subject, &triple.predicate, &triple.object)
    }

    /// Add a triple given by its parts
    pub fn insert(&mut self, subject: &Term, predicate: &Term, object: &Term) -> bool {
        let key = [self.intern(subject), self.intern(predicate), self.intern(object)];
        if !self.triples.insert(key) {
            return false;
        }
        self.by_subject.entry(key[0]).or_default().insert(key);
        self.by_predicate.entry(key[1]).or_default().insert(key);
        self.by_object.entry(key[2]).or_default().insert(key);
        self.generation += 1;
        self.insertions += 1;
        true
    }

    /// Add multiple triples, returning how many were new
    pub fn add_all(&mut self, triples: impl IntoIterator<Item = Triple>) -> usize {
        triples.into_iter().filter(|t| self.insert(&t.subject, &t.predicate, &t.object)).count()
    }

    /// Remove a triple from the store
    pub fn remove(&mut self, triple: &Triple) -> bool {
        self.delete(&triple.subject, &triple.predicate, &triple.object)
    }

    /// Remove a triple given by its parts
    pub fn delete(&mut self, subject: &Term, predicate: &Term, object: &Term) -> bool {
        let key = match self.key_of(subject, predicate, object) {
            Some(key) => key,
            None => return false,
        };
        if !self.triples.swap_remove(&key) {
            return false;
        }
        for (index, id) in [
            (&mut self.by_subject, key[0]),
            (&mut self.by_predicate, key[1]),
            (&mut self.by_object, key[2]),
        ] {
            if let Some(keys) = index.get_mut(&id) {
                keys.swap_remove(&key);
                if keys.is_empty() {
                    index.remove(&id);
                }
            }
        }
        self.generation += 1;
        self.deletions += 1;
        true
    }

    /// Remove every triple matching a pattern, returning how many were removed
    pub fn remove_matching(
        &mut self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
    ) -> usize {
        self.matching(subject, predicate, object)
            .iter()
            .filter(|t| self.remove(t))
            .count()
    }

    /// Rewrite every triple mentioning `from` so that it mentions `to`
    ///
    /// Subject and object positions are always rewritten; the predicate
    /// position only when `predicates` is set. Returns the number of triples
    /// rewritten.
    pub fn replace_term(&mut self, from: &Term, to: &Term, predicates: bool) -> usize {
        if from == to {
            return 0;
        }
        let mut affected: IndexSet<Triple> = IndexSet::new();
        affected.extend(self.matching(Some(from), None, None));
        affected.extend(self.matching(None, None, Some(from)));
        if predicates {
            affected.extend(self.matching(None, Some(from), None));
        }

        let swap = |term: &Term| if term == from { to.clone() } else { term.clone() };
        for triple in &affected {
            self.remove(triple);
            let predicate = if predicates { swap(&triple.predicate) } else { triple.predicate.clone() };
            self.insert(&swap(&triple.subject), &predicate, &swap(&triple.object));
        }
        affected.len()
    }

    fn key_of(&self, subject: &Term, predicate: &Term, object: &Term) -> Option<Key> {
        Some([self.lookup(subject)?, self.lookup(predicate)?, self.lookup(object)?])
    }

    /// Check if the store contains a triple
    pub fn contains(&self, triple: &Triple) -> bool {
        self.has(&triple.subject, &triple.predicate, &triple.object)
    }

    /// Check if the store contains a triple given by its parts
    pub fn has(&self, subject: &Term, predicate: &Term, object: &Term) -> bool {
        self.key_of(subject, predicate, object)
            .map(|key| self.triples.contains(&key))
            .unwrap_or(false)
    }

    /// Match a pattern where `None` is a wildcard
    ///
    /// The narrowest bound index drives the scan.
    pub fn matching(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
    ) -> Vec<Triple> {
        let mut bound = [None; 3];
        for (slot, term) in [subject, predicate, object].into_iter().enumerate() {
            if let Some(term) = term {
                match self.lookup(term) {
                    Some(id) => bound[slot] = Some(id),
                    None => return Vec::new(),
                }
            }
        }

        let mut scan: Option<&FnvIndexSet<Key>> = None;
        for (id, index) in [
            (bound[0], &self.by_subject),
            (bound[1], &self.by_predicate),
            (bound[2], &self.by_object),
        ] {
            if let Some(id) = id {
                match index.get(&id) {
                    Some(keys) if scan.map_or(true, |s| keys.len() < s.len()) => scan = Some(keys),
                    Some(_) => {}
                    None => return Vec::new(),
                }
            }
        }
        let scan = scan.unwrap_or(&self.triples);

        scan.iter()
            .filter(|key| {
                key.iter()
                    .zip(bound.iter())
                    .all(|(id, want)| want.map_or(true, |w| *id == w))
            })
            .map(|key| self.materialize(key))
            .collect()
    }

    /// Objects `o` such that `(subject, predicate, o)` holds
    pub fn objects(&self, subject: &Term, predicate: &Term) -> Vec<Term> {
        self.matching(Some(subject), Some(predicate), None)
            .into_iter()
            .map(|t| t.object)
            .collect()
    }

    /// Subjects `s` such that `(s, predicate, object)` holds
    pub fn subjects(&self, predicate: &Term, object: &Term) -> Vec<Term> {
        self.matching(None, Some(predicate), Some(object))
            .into_iter()
            .map(|t| t.subject)
            .collect()
    }

    /// All `(s, o)` pairs related by `predicate`
    pub fn subject_objects(&self, predicate: &Term) -> Vec<(Term, Term)> {
        self.matching(None, Some(predicate), None)
            .into_iter()
            .map(|t| (t.subject, t.object))
            .collect()
    }

    /// All `(p, o)` pairs of a subject
    pub fn predicate_objects(&self, subject: &Term) -> Vec<(Term, Term)> {
        self.matching(Some(subject), None, None)
            .into_iter()
            .map(|t| (t.predicate, t.object))
            .collect()
    }

    /// Every `x` with a chain `x predicate ... predicate object`, excluding
    /// `object` itself unless it lies on a cycle
    pub fn transitive_subjects(&self, predicate: &Term, object: &Term) -> IndexSet<Term> {
        let mut seen = IndexSet::new();
        let mut frontier = vec![object.clone()];
        while let Some(current) = frontier.pop() {
            for subject in self.subjects(predicate, &current) {
                if seen.insert(subject.clone()) {
                    frontier.push(subject);
                }
            }
        }
        seen
    }

    /// Check whether a term occurs anywhere in the store
    pub fn mentions(&self, term: &Term) -> bool {
        self.lookup(term).map_or(false, |id| {
            self.by_subject.contains_key(&id)
                || self.by_predicate.contains_key(&id)
                || self.by_object.contains_key(&id)
        })
    }

    /// Snapshot of all triples in insertion order
    pub fn triples(&self) -> Vec<Triple> {
        self.iter().collect()
    }

    /// Snapshot of all triples in term order
    pub fn sorted(&self) -> Vec<Triple> {
        let mut triples = self.triples();
        triples.sort();
        triples
    }

    /// Get the number of triples
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Number of effective mutations since creation
    ///
    /// Adding a duplicate or removing an absent triple does not count.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Total triples ever inserted, duplicates excluded
    pub fn insertions(&self) -> u64 {
        self.insertions
    }

    /// Total triples ever removed
    pub fn deletions(&self) -> u64 {
        self.deletions
    }

    /// Clear all triples
    pub fn clear(&mut self) {
        if !self.triples.is_empty() {
            self.generation += 1;
        }
        self.terms.clear();
        self.triples.clear();
        self.by_subject.clear();
        self.by_predicate.clear();
        self.by_object.clear();
    }

    /// Iterate over all triples
    pub fn iter(&self) -> impl Iterator<Item = Triple> + '_ {
        self.triples.iter().map(move |key| self.materialize(key))
    }
}

impl FromIterator<Triple> for Store {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        let mut store = Store::new();
        store.add_all(iter);
        store
    }
}

impl Extend<Triple> for Store {
    fn extend<I: IntoIterator<Item = Triple>>(&mut self, iter: I) {
        self.add_all(iter);
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Store {{")?;
        for triple in self.iter() {
            writeln!(f, "  {:?}", triple)?;
        }
        write!(f, "}}")
    }
}
